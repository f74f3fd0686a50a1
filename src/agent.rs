//! The user-controlled signing agent (a wallet) the session gateway talks to.
//!
//! The agent authorizes accounts and owns network selection. Absence of an
//! agent is an expected condition, so callers hold it as an `Option`.

use crate::{
    network::AddChainParams,
    rpc::{
        JsonRpcClient,
        RpcError,
        parse_quantity,
    },
};
use serde::de::DeserializeOwned;
use serde_json::{
    Value,
    json,
};
use std::{
    fmt,
    future::Future,
};

pub trait SigningAgent {
    /// Accounts already authorized for this application. Must never prompt.
    fn accounts(&self) -> impl Future<Output = Result<Vec<String>, RpcError>> + Send;

    /// Asks the user to authorize account access.
    fn request_accounts(
        &self,
    ) -> impl Future<Output = Result<Vec<String>, RpcError>> + Send;

    fn chain_id(&self) -> impl Future<Output = Result<u64, RpcError>> + Send;

    fn switch_chain(
        &self,
        chain_id_hex: &str,
    ) -> impl Future<Output = Result<(), RpcError>> + Send;

    fn add_chain(
        &self,
        params: &AddChainParams,
    ) -> impl Future<Output = Result<(), RpcError>> + Send;

    /// Native-currency balance in wei.
    fn balance(&self, address: &str) -> impl Future<Output = Result<u128, RpcError>> + Send;
}

/// Signing agent reached through its JSON-RPC endpoint, speaking the EIP-1193
/// method set.
#[derive(Clone)]
pub struct HttpSigningAgent {
    rpc: JsonRpcClient,
}

impl HttpSigningAgent {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        Ok(Self {
            rpc: JsonRpcClient::new(url)?,
        })
    }

    pub fn rpc(&self) -> &JsonRpcClient {
        &self.rpc
    }

    async fn send<T: DeserializeOwned>(&self, request: AgentRequest<'_>) -> Result<T, RpcError> {
        self.rpc.request(request.method(), request.params()).await
    }
}

impl SigningAgent for HttpSigningAgent {
    async fn accounts(&self) -> Result<Vec<String>, RpcError> {
        self.send(AgentRequest::Accounts).await
    }

    async fn request_accounts(&self) -> Result<Vec<String>, RpcError> {
        self.send(AgentRequest::RequestAccounts).await
    }

    async fn chain_id(&self) -> Result<u64, RpcError> {
        let raw: String = self.send(AgentRequest::ChainId).await?;
        let id = parse_quantity(&raw)?;
        u64::try_from(id).map_err(|_| RpcError::Decode(format!("chain id out of range: {raw}")))
    }

    async fn switch_chain(&self, chain_id_hex: &str) -> Result<(), RpcError> {
        let _: Value = self.send(AgentRequest::SwitchChain(chain_id_hex)).await?;
        Ok(())
    }

    async fn add_chain(&self, params: &AddChainParams) -> Result<(), RpcError> {
        let _: Value = self.send(AgentRequest::AddChain(params)).await?;
        Ok(())
    }

    async fn balance(&self, address: &str) -> Result<u128, RpcError> {
        let raw: String = self.send(AgentRequest::Balance(address)).await?;
        parse_quantity(&raw)
    }
}

/// One EIP-1193 call as it goes on the wire.
#[derive(Clone, Copy, Debug)]
enum AgentRequest<'a> {
    Accounts,
    RequestAccounts,
    ChainId,
    SwitchChain(&'a str),
    AddChain(&'a AddChainParams),
    Balance(&'a str),
}

impl AgentRequest<'_> {
    fn method(&self) -> &'static str {
        match self {
            AgentRequest::Accounts => "eth_accounts",
            AgentRequest::RequestAccounts => "eth_requestAccounts",
            AgentRequest::ChainId => "eth_chainId",
            AgentRequest::SwitchChain(_) => "wallet_switchEthereumChain",
            AgentRequest::AddChain(_) => "wallet_addEthereumChain",
            AgentRequest::Balance(_) => "eth_getBalance",
        }
    }

    fn params(&self) -> Value {
        match self {
            AgentRequest::Accounts | AgentRequest::RequestAccounts | AgentRequest::ChainId => {
                json!([])
            }
            AgentRequest::SwitchChain(chain_id_hex) => json!([{ "chainId": chain_id_hex }]),
            AgentRequest::AddChain(params) => json!([params]),
            AgentRequest::Balance(address) => json!([address, "latest"]),
        }
    }
}

impl fmt::Display for HttpSigningAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signing agent at {}", self.rpc)
    }
}
