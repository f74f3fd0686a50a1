#![allow(non_snake_case)]

use geo_gacha::{
    network::flow_evm_testnet,
    rpc::USER_REJECTED_CODE,
    test_helpers::{
        ALICE,
        AgentCall,
        MockAgent,
    },
    wallet::{
        MIN_GAS_BALANCE_WEI,
        WalletError,
        WalletGateway,
    },
};

fn gateway(agent: &MockAgent) -> WalletGateway<MockAgent> {
    WalletGateway::new(Some(agent.clone()), flow_evm_testnet())
}

#[tokio::test]
async fn connect__without_agent_fails_with_no_wallet_found() {
    // given
    let mut gateway: WalletGateway<MockAgent> = WalletGateway::new(None, flow_evm_testnet());

    // when
    let result = gateway.connect().await;

    // then
    assert!(matches!(result, Err(WalletError::NoWalletFound)));
    assert!(!gateway.session().connected);
}

#[tokio::test]
async fn connect__on_target_chain_issues_no_switch() {
    // given
    let agent = MockAgent::new().on_chain(545).with_balance(2 * MIN_GAS_BALANCE_WEI);
    let mut gateway = gateway(&agent);

    // when
    let session = gateway.connect().await.unwrap();

    // then
    assert_eq!(session.address.as_deref(), Some(ALICE));
    assert!(session.connected);
    assert_eq!(session.native_balance, "0.002");
    assert!(gateway.balance().has_enough_for_gas);
    assert!(agent.switch_calls().is_empty());
    assert!(agent.add_calls().is_empty());
}

#[tokio::test]
async fn connect__wrong_chain_switches_with_hex_chain_id_and_does_not_add() {
    // given
    let agent = MockAgent::new()
        .with_authorized_account(ALICE)
        .on_chain(1)
        .knowing_chain(545);
    let mut gateway = gateway(&agent);

    // when
    let session = gateway.connect().await.unwrap();

    // then
    assert!(session.connected);
    assert_eq!(agent.switch_calls(), vec![String::from("0x221")]);
    assert!(agent.add_calls().is_empty());
    assert_eq!(agent.current_chain(), 545);
}

#[tokio::test]
async fn connect__unknown_chain_adds_network_then_switches_again() {
    // given
    let agent = MockAgent::new().on_chain(1);
    let mut gateway = gateway(&agent);

    // when
    let session = gateway.connect().await.unwrap();

    // then
    assert!(session.connected);
    let added = agent.add_calls();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0], flow_evm_testnet().add_chain_params());
    assert_eq!(
        agent.switch_calls(),
        vec![String::from("0x221"), String::from("0x221")]
    );
    assert_eq!(agent.current_chain(), 545);
}

#[tokio::test]
async fn connect__add_chain_request_carries_full_descriptor() {
    // given
    let agent = MockAgent::new().on_chain(1);
    let mut gateway = gateway(&agent);

    // when
    gateway.connect().await.unwrap();

    // then
    let body = serde_json::to_value(&agent.add_calls()[0]).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "chainId": "0x221",
            "chainName": "Flow EVM Testnet",
            "nativeCurrency": { "name": "FLOW", "symbol": "FLOW", "decimals": 18 },
            "rpcUrls": ["https://testnet.evm.nodes.onflow.org"],
            "blockExplorerUrls": ["https://evm-testnet.flowscan.io"],
        })
    );
}

#[tokio::test]
async fn connect__rejected_switch_surfaces_network_switch_error() {
    // given
    let agent = MockAgent::new().on_chain(1).failing_switch_with(USER_REJECTED_CODE);
    let mut gateway = gateway(&agent);

    // when
    let result = gateway.connect().await;

    // then
    match result {
        Err(WalletError::NetworkSwitch(err)) => {
            assert_eq!(err.code(), Some(USER_REJECTED_CODE))
        }
        other => panic!("expected a network switch error, got {other:?}"),
    }
    assert!(agent.add_calls().is_empty());
    assert!(!gateway.session().connected);
}

#[tokio::test]
async fn connect__rejected_add_surfaces_network_switch_error() {
    // given
    let agent = MockAgent::new().on_chain(1).failing_add_with(USER_REJECTED_CODE);
    let mut gateway = gateway(&agent);

    // when
    let result = gateway.connect().await;

    // then
    assert!(matches!(result, Err(WalletError::NetworkSwitch(_))));
    assert_eq!(agent.switch_calls().len(), 1);
}

#[tokio::test]
async fn connect__denied_account_access_is_surfaced() {
    // given
    let agent = MockAgent::new().rejecting_access();
    let mut gateway = gateway(&agent);

    // when
    let result = gateway.connect().await;

    // then
    assert!(matches!(result, Err(WalletError::AccountAccess(_))));
    assert_eq!(agent.calls(), vec![AgentCall::RequestAccounts]);
}

#[tokio::test]
async fn connect__empty_account_list_is_an_error() {
    let agent = MockAgent::new().with_no_grantable_accounts();
    let mut gateway = gateway(&agent);

    let result = gateway.connect().await;

    assert!(matches!(result, Err(WalletError::NoAccounts)));
}

#[tokio::test]
async fn check_existing_session__absent_when_nothing_is_authorized() {
    // given
    let agent = MockAgent::new();
    let mut gateway = gateway(&agent);

    // when
    let session = gateway.check_existing_session().await;

    // then
    assert!(session.is_none());
    assert_eq!(agent.calls(), vec![AgentCall::Accounts]);
}

#[tokio::test]
async fn check_existing_session__absent_without_agent() {
    let mut gateway: WalletGateway<MockAgent> = WalletGateway::new(None, flow_evm_testnet());

    assert!(gateway.check_existing_session().await.is_none());
}

#[tokio::test]
async fn check_existing_session__restores_authorized_account_without_prompting() {
    // given
    let agent = MockAgent::new()
        .with_authorized_account(ALICE)
        .with_balance(1_500_000_000_000_000_000);
    let mut gateway = gateway(&agent);

    // when
    let session = gateway.check_existing_session().await.unwrap();

    // then
    assert_eq!(session.address.as_deref(), Some(ALICE));
    assert_eq!(session.native_balance, "1.5");
    assert!(!agent.calls().contains(&AgentCall::RequestAccounts));
}

#[tokio::test]
async fn get_balance__failure_reports_zero_and_not_enough_for_gas() {
    // given
    let agent = MockAgent::new().failing_balance();
    let gateway = gateway(&agent);

    // when
    let info = gateway.get_balance(ALICE).await;

    // then
    assert_eq!(info.balance, "0");
    assert!(!info.has_enough_for_gas);
}

#[tokio::test]
async fn get_balance__exact_threshold_is_not_enough_for_gas() {
    let agent = MockAgent::new().with_balance(MIN_GAS_BALANCE_WEI);
    let gateway = gateway(&agent);

    let info = gateway.get_balance(ALICE).await;

    assert_eq!(info.balance, "0.001");
    assert!(!info.has_enough_for_gas);
}

#[tokio::test]
async fn refresh_balance__updates_session_balance() {
    // given
    let agent = MockAgent::new().with_authorized_account(ALICE);
    let mut gateway = gateway(&agent);
    gateway.check_existing_session().await.unwrap();
    let agent = agent.with_balance(3_000_000_000_000_000_000);

    // when
    let info = gateway.refresh_balance().await.unwrap();

    // then
    assert_eq!(info.balance, "3.0");
    assert_eq!(gateway.session().native_balance, "3.0");
    assert_eq!(
        agent
            .calls()
            .iter()
            .filter(|c| matches!(c, AgentCall::Balance(_)))
            .count(),
        2
    );
}

#[tokio::test]
async fn connect__failure_after_restore_clears_session_and_balance() {
    // given
    let agent = MockAgent::new()
        .with_authorized_account(ALICE)
        .on_chain(1)
        .failing_switch_with(USER_REJECTED_CODE)
        .with_balance(3 * MIN_GAS_BALANCE_WEI);
    let mut gateway = gateway(&agent);
    gateway.check_existing_session().await.unwrap();

    // when
    let result = gateway.connect().await;

    // then
    assert!(matches!(result, Err(WalletError::NetworkSwitch(_))));
    assert!(!gateway.session().connected);
    assert_eq!(gateway.session().address, None);
    assert!(!gateway.balance().has_enough_for_gas);
}
