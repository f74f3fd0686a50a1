use crate::{
    agent::SigningAgent,
    contract::RandomnessSource,
    network::AddChainParams,
    rpc::{
        ChainReader,
        RpcError,
        TransactionReceipt,
        UNRECOGNIZED_CHAIN_CODE,
        USER_REJECTED_CODE,
        parse_quantity,
    },
};
use std::{
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
    },
    time::Duration,
};

pub const ALICE: &str = "0x00000000000000000000000000000000000a11ce";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AgentCall {
    Accounts,
    RequestAccounts,
    ChainId,
    SwitchChain(String),
    AddChain(AddChainParams),
    Balance(String),
}

#[derive(Debug)]
struct MockAgentState {
    authorized: Vec<String>,
    grantable: Vec<String>,
    reject_access: bool,
    chain_id: u64,
    known_chains: Vec<u64>,
    switch_error: Option<i64>,
    add_error: Option<i64>,
    balance: Option<u128>,
    calls: Vec<AgentCall>,
}

/// In-memory signing agent. Clones share state so a test can keep a handle
/// after giving one to the gateway.
#[derive(Clone, Debug)]
pub struct MockAgent {
    state: Arc<Mutex<MockAgentState>>,
}

impl Default for MockAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAgent {
    /// Agent on chain 1 with nothing authorized that grants [`ALICE`] on request.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockAgentState {
                authorized: Vec::new(),
                grantable: vec![ALICE.to_string()],
                reject_access: false,
                chain_id: 1,
                known_chains: vec![1],
                switch_error: None,
                add_error: None,
                balance: Some(0),
                calls: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockAgentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_authorized_account(self, address: &str) -> Self {
        {
            let mut state = self.lock();
            state.authorized = vec![address.to_string()];
            state.grantable = vec![address.to_string()];
        }
        self
    }

    pub fn with_no_grantable_accounts(self) -> Self {
        self.lock().grantable.clear();
        self
    }

    pub fn rejecting_access(self) -> Self {
        self.lock().reject_access = true;
        self
    }

    pub fn on_chain(self, chain_id: u64) -> Self {
        {
            let mut state = self.lock();
            state.chain_id = chain_id;
            if !state.known_chains.contains(&chain_id) {
                state.known_chains.push(chain_id);
            }
        }
        self
    }

    pub fn knowing_chain(self, chain_id: u64) -> Self {
        self.lock().known_chains.push(chain_id);
        self
    }

    pub fn failing_switch_with(self, code: i64) -> Self {
        self.lock().switch_error = Some(code);
        self
    }

    pub fn failing_add_with(self, code: i64) -> Self {
        self.lock().add_error = Some(code);
        self
    }

    pub fn with_balance(self, wei: u128) -> Self {
        self.lock().balance = Some(wei);
        self
    }

    pub fn failing_balance(self) -> Self {
        self.lock().balance = None;
        self
    }

    pub fn calls(&self) -> Vec<AgentCall> {
        self.lock().calls.clone()
    }

    pub fn current_chain(&self) -> u64 {
        self.lock().chain_id
    }

    pub fn switch_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                AgentCall::SwitchChain(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn add_calls(&self) -> Vec<AddChainParams> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                AgentCall::AddChain(params) => Some(params),
                _ => None,
            })
            .collect()
    }
}

impl SigningAgent for MockAgent {
    async fn accounts(&self) -> Result<Vec<String>, RpcError> {
        let mut state = self.lock();
        state.calls.push(AgentCall::Accounts);
        Ok(state.authorized.clone())
    }

    async fn request_accounts(&self) -> Result<Vec<String>, RpcError> {
        let mut state = self.lock();
        state.calls.push(AgentCall::RequestAccounts);
        if state.reject_access {
            return Err(RpcError::rpc(USER_REJECTED_CODE, "User rejected the request."));
        }
        if state.authorized.is_empty() {
            state.authorized = state.grantable.clone();
        }
        Ok(state.authorized.clone())
    }

    async fn chain_id(&self) -> Result<u64, RpcError> {
        let mut state = self.lock();
        state.calls.push(AgentCall::ChainId);
        Ok(state.chain_id)
    }

    async fn switch_chain(&self, chain_id_hex: &str) -> Result<(), RpcError> {
        let mut state = self.lock();
        state.calls.push(AgentCall::SwitchChain(chain_id_hex.to_string()));
        if let Some(code) = state.switch_error {
            return Err(RpcError::rpc(code, "switch failed"));
        }
        let chain_id = u64::try_from(parse_quantity(chain_id_hex)?)
            .map_err(|_| RpcError::Decode(chain_id_hex.to_string()))?;
        if !state.known_chains.contains(&chain_id) {
            return Err(RpcError::rpc(
                UNRECOGNIZED_CHAIN_CODE,
                format!("Unrecognized chain ID \"{chain_id_hex}\""),
            ));
        }
        state.chain_id = chain_id;
        Ok(())
    }

    async fn add_chain(&self, params: &AddChainParams) -> Result<(), RpcError> {
        let mut state = self.lock();
        state.calls.push(AgentCall::AddChain(params.clone()));
        if let Some(code) = state.add_error {
            return Err(RpcError::rpc(code, "add chain failed"));
        }
        let chain_id = u64::try_from(parse_quantity(&params.chain_id)?)
            .map_err(|_| RpcError::Decode(params.chain_id.clone()))?;
        state.known_chains.push(chain_id);
        Ok(())
    }

    async fn balance(&self, address: &str) -> Result<u128, RpcError> {
        let mut state = self.lock();
        state.calls.push(AgentCall::Balance(address.to_string()));
        state
            .balance
            .ok_or_else(|| RpcError::rpc(-32603, "balance unavailable"))
    }
}

/// Randomness source that answers with a fixed roll and either a fixed item
/// or the first candidate it is offered.
#[derive(Clone, Debug)]
pub struct ScriptedRandomness {
    roll: u64,
    item: Option<String>,
    fail_selection: bool,
    offered: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedRandomness {
    pub fn new(roll: u64) -> Self {
        Self {
            roll,
            item: None,
            fail_selection: false,
            offered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn selecting(mut self, item: &str) -> Self {
        self.item = Some(item.to_string());
        self
    }

    pub fn failing_selection(mut self) -> Self {
        self.fail_selection = true;
        self
    }

    /// Candidate lists passed to `select_item`, in call order.
    pub fn offered(&self) -> Vec<Vec<String>> {
        self.offered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RandomnessSource for ScriptedRandomness {
    async fn random_number(&self, _min: u64, _max: u64) -> Result<u64, RpcError> {
        Ok(self.roll)
    }

    async fn select_item(&self, items: &[&str]) -> Result<String, RpcError> {
        self.offered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(items.iter().map(|s| s.to_string()).collect());
        if self.fail_selection {
            return Err(RpcError::rpc(-32000, "execution reverted"));
        }
        match &self.item {
            Some(item) => Ok(item.clone()),
            None => items
                .first()
                .map(|s| s.to_string())
                .ok_or_else(|| RpcError::Decode(String::from("no candidates"))),
        }
    }
}

/// Randomness source whose every call reverts.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingRandomness;

impl RandomnessSource for FailingRandomness {
    async fn random_number(&self, _min: u64, _max: u64) -> Result<u64, RpcError> {
        Err(RpcError::rpc(-32000, "execution reverted"))
    }

    async fn select_item(&self, _items: &[&str]) -> Result<String, RpcError> {
        Err(RpcError::rpc(-32000, "execution reverted"))
    }
}

/// Randomness source that waits before answering like [`ScriptedRandomness`].
#[derive(Clone, Debug)]
pub struct SlowRandomness {
    delay: Duration,
    inner: ScriptedRandomness,
}

impl SlowRandomness {
    pub fn new(delay: Duration, roll: u64) -> Self {
        Self {
            delay,
            inner: ScriptedRandomness::new(roll),
        }
    }
}

impl RandomnessSource for SlowRandomness {
    async fn random_number(&self, min: u64, max: u64) -> Result<u64, RpcError> {
        tokio::time::sleep(self.delay).await;
        self.inner.random_number(min, max).await
    }

    async fn select_item(&self, items: &[&str]) -> Result<String, RpcError> {
        self.inner.select_item(items).await
    }
}

/// Chain reader returning canned `eth_call` output and receipt.
#[derive(Clone, Debug, Default)]
pub struct CannedChain {
    call_output: Vec<u8>,
    receipt: Option<TransactionReceipt>,
    fail: bool,
    calls: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl CannedChain {
    pub fn returning(call_output: Vec<u8>) -> Self {
        Self {
            call_output,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_receipt(mut self, receipt: TransactionReceipt) -> Self {
        self.receipt = Some(receipt);
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<u8>)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ChainReader for CannedChain {
    async fn call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((to.to_string(), data.to_vec()));
        if self.fail {
            return Err(RpcError::rpc(-32000, "execution reverted"));
        }
        Ok(self.call_output.clone())
    }

    async fn transaction_receipt(
        &self,
        _hash: &str,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        if self.fail {
            return Err(RpcError::rpc(-32603, "internal error"));
        }
        Ok(self.receipt.clone())
    }
}
