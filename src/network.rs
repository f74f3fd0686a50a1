use serde::Serialize;
use std::fmt;

pub const NATIVE_DECIMALS: u8 = 18;

/// Chain the signing agent must be connected to before contract calls are valid.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TargetNetwork {
    pub chain_id: u64,
    pub name: String,
    pub currency_symbol: String,
    pub rpc_url: String,
    pub explorer_url: String,
}

pub fn flow_evm_testnet() -> TargetNetwork {
    TargetNetwork {
        chain_id: 545,
        name: String::from("Flow EVM Testnet"),
        currency_symbol: String::from("FLOW"),
        rpc_url: String::from("https://testnet.evm.nodes.onflow.org"),
        explorer_url: String::from("https://evm-testnet.flowscan.io"),
    }
}

impl TargetNetwork {
    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = url.into();
        self
    }

    /// `0x`-prefixed lowercase hex, the form `wallet_switchEthereumChain` expects.
    pub fn chain_id_hex(&self) -> String {
        chain_id_to_hex(self.chain_id)
    }

    pub fn matches(&self, chain_id: u64) -> bool {
        self.chain_id == chain_id
    }

    pub fn add_chain_params(&self) -> AddChainParams {
        AddChainParams {
            chain_id: self.chain_id_hex(),
            chain_name: self.name.clone(),
            native_currency: NativeCurrency {
                name: self.currency_symbol.clone(),
                symbol: self.currency_symbol.clone(),
                decimals: NATIVE_DECIMALS,
            },
            rpc_urls: vec![self.rpc_url.clone()],
            block_explorer_urls: vec![self.explorer_url.clone()],
        }
    }

    pub fn explorer_address_url(&self, address: &str) -> String {
        format!(
            "{}/address/{}",
            self.explorer_url.trim_end_matches('/'),
            address
        )
    }
}

impl fmt::Display for TargetNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.chain_id)
    }
}

pub fn chain_id_to_hex(chain_id: u64) -> String {
    format!("0x{chain_id:x}")
}

/// Body of a `wallet_addEthereumChain` request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn chain_id_hex__encodes_flow_testnet_as_0x221() {
        // given
        let network = flow_evm_testnet();

        // when
        let hex = network.chain_id_hex();

        // then
        assert_eq!(hex, "0x221");
    }

    #[test]
    fn add_chain_params__serializes_with_registration_field_names() {
        // given
        let network = flow_evm_testnet();

        // when
        let json = serde_json::to_value(network.add_chain_params()).unwrap();

        // then
        let expected = serde_json::json!({
            "chainId": "0x221",
            "chainName": "Flow EVM Testnet",
            "nativeCurrency": { "name": "FLOW", "symbol": "FLOW", "decimals": 18 },
            "rpcUrls": ["https://testnet.evm.nodes.onflow.org"],
            "blockExplorerUrls": ["https://evm-testnet.flowscan.io"],
        });
        assert_eq!(json, expected);
    }

    #[test]
    fn explorer_address_url__joins_without_double_slash() {
        let mut network = flow_evm_testnet();
        network.explorer_url.push('/');

        let url = network.explorer_address_url("0xabc");

        assert_eq!(url, "https://evm-testnet.flowscan.io/address/0xabc");
    }
}
