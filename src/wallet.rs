//! Session/wallet gateway.
//!
//! Tracks the connection to the signing agent and is the only writer of the
//! [`WalletSession`]. User-initiated connects surface their errors; balance
//! queries are advisory and fail soft.

use crate::{
    agent::SigningAgent,
    network::{
        NATIVE_DECIMALS,
        TargetNetwork,
    },
    rpc::RpcError,
};
use thiserror::Error;
use tracing::{
    info,
    warn,
};

/// 0.001 native units, the least balance considered enough to pay for gas.
pub const MIN_GAS_BALANCE_WEI: u128 = 1_000_000_000_000_000;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("no signing agent found")]
    NoWalletFound,
    #[error("signing agent returned no accounts")]
    NoAccounts,
    #[error("account access was not granted: {0}")]
    AccountAccess(#[source] RpcError),
    #[error("network switch rejected: {0}")]
    NetworkSwitch(#[source] RpcError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WalletSession {
    pub address: Option<String>,
    pub connected: bool,
    pub native_balance: String,
}

impl WalletSession {
    fn connected(address: String, native_balance: String) -> Self {
        Self {
            address: Some(address),
            connected: true,
            native_balance,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BalanceInfo {
    pub balance: String,
    pub has_enough_for_gas: bool,
}

impl BalanceInfo {
    pub fn from_wei(wei: u128) -> Self {
        Self {
            balance: format_units(wei, NATIVE_DECIMALS),
            has_enough_for_gas: wei > MIN_GAS_BALANCE_WEI,
        }
    }

    pub fn zero() -> Self {
        Self {
            balance: String::from("0"),
            has_enough_for_gas: false,
        }
    }
}

pub struct WalletGateway<A> {
    agent: Option<A>,
    network: TargetNetwork,
    session: WalletSession,
    balance: BalanceInfo,
}

impl<A: SigningAgent> WalletGateway<A> {
    pub fn new(agent: Option<A>, network: TargetNetwork) -> Self {
        Self {
            agent,
            network,
            session: WalletSession::default(),
            balance: BalanceInfo::zero(),
        }
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    /// Balance last read for the session account.
    pub fn balance(&self) -> &BalanceInfo {
        &self.balance
    }

    pub fn network(&self) -> &TargetNetwork {
        &self.network
    }

    pub fn has_agent(&self) -> bool {
        self.agent.is_some()
    }

    /// Requests account access and makes sure the agent is on the target network.
    /// Any failure after the agent is found drops the previous session.
    pub async fn connect(&mut self) -> Result<WalletSession, WalletError> {
        let agent = self.agent.as_ref().ok_or(WalletError::NoWalletFound)?;
        let address = match authorize_on_network(agent, &self.network).await {
            Ok(address) => address,
            Err(err) => {
                self.session = WalletSession::default();
                self.balance = BalanceInfo::zero();
                return Err(err);
            }
        };

        let balance = self.get_balance(&address).await;
        self.session = WalletSession::connected(address, balance.balance.clone());
        self.balance = balance;
        info!(address = ?self.session.address, "wallet connected");
        Ok(self.session.clone())
    }

    /// Restores a session from accounts the agent already authorized, without prompting.
    pub async fn check_existing_session(&mut self) -> Option<WalletSession> {
        let agent = self.agent.as_ref()?;
        let accounts = match agent.accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                warn!(?err, "failed to check wallet connection");
                return None;
            }
        };
        let address = accounts.into_iter().next()?;
        let balance = self.get_balance(&address).await;
        self.session = WalletSession::connected(address, balance.balance.clone());
        self.balance = balance;
        info!(address = ?self.session.address, "restored wallet session");
        Some(self.session.clone())
    }

    pub async fn get_balance(&self, address: &str) -> BalanceInfo {
        let Some(agent) = self.agent.as_ref() else {
            return BalanceInfo::zero();
        };
        match agent.balance(address).await {
            Ok(wei) => BalanceInfo::from_wei(wei),
            Err(err) => {
                warn!(?err, %address, "failed to check balance");
                BalanceInfo::zero()
            }
        }
    }

    /// Re-reads the balance of the connected account into the session.
    pub async fn refresh_balance(&mut self) -> Option<BalanceInfo> {
        let address = self.session.address.clone()?;
        let info = self.get_balance(&address).await;
        self.session.native_balance = info.balance.clone();
        self.balance = info.clone();
        Some(info)
    }
}

async fn authorize_on_network<A: SigningAgent>(
    agent: &A,
    network: &TargetNetwork,
) -> Result<String, WalletError> {
    let accounts = agent
        .request_accounts()
        .await
        .map_err(WalletError::AccountAccess)?;
    let address = accounts.into_iter().next().ok_or(WalletError::NoAccounts)?;

    let chain_id = agent.chain_id().await?;
    if !network.matches(chain_id) {
        info!(
            current = chain_id,
            target = network.chain_id,
            "switching signing agent network"
        );
        ensure_network(agent, network).await?;
    }
    Ok(address)
}

async fn ensure_network<A: SigningAgent>(
    agent: &A,
    network: &TargetNetwork,
) -> Result<(), WalletError> {
    let chain_id_hex = network.chain_id_hex();
    match agent.switch_chain(&chain_id_hex).await {
        Ok(()) => Ok(()),
        Err(err) if err.is_unrecognized_chain() => {
            info!(network = %network, "target network unknown to agent, adding it");
            agent
                .add_chain(&network.add_chain_params())
                .await
                .map_err(WalletError::NetworkSwitch)?;
            agent
                .switch_chain(&chain_id_hex)
                .await
                .map_err(WalletError::NetworkSwitch)
        }
        Err(err) => Err(WalletError::NetworkSwitch(err)),
    }
}

/// Formats a base-unit amount as a decimal string, always with at least one
/// fractional digit (`0.0`, `1.5`).
pub fn format_units(amount: u128, decimals: u8) -> String {
    let one_unit = 10u128.pow(u32::from(decimals));
    let whole = amount / one_unit;
    let fractional = amount % one_unit;
    if fractional == 0 {
        return format!("{whole}.0");
    }
    let padded = format!("{:0width$}", fractional, width = usize::from(decimals));
    format!("{}.{}", whole, padded.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn format_units__trims_trailing_zeros() {
        assert_eq!(format_units(0, 18), "0.0");
        assert_eq!(format_units(1_500_000_000_000_000_000, 18), "1.5");
        assert_eq!(format_units(1_000_000_000_000_000, 18), "0.001");
        assert_eq!(format_units(42_000_000_000_000_000_000, 18), "42.0");
        assert_eq!(format_units(1, 18), "0.000000000000000001");
    }

    #[test]
    fn balance_info__gas_threshold_is_strict() {
        assert!(!BalanceInfo::from_wei(MIN_GAS_BALANCE_WEI).has_enough_for_gas);
        assert!(BalanceInfo::from_wei(MIN_GAS_BALANCE_WEI + 1).has_enough_for_gas);
        assert!(!BalanceInfo::zero().has_enough_for_gas);
    }
}
