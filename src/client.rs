use crate::{
    agent::{
        HttpSigningAgent,
        SigningAgent,
    },
    collection::{
        Collection,
        CollectionItem,
    },
    contract::{
        DEFAULT_RANDOMNESS_CONTRACT,
        RandomnessContract,
        RandomnessSource,
    },
    draw::{
        DrawError,
        RewardDrawer,
    },
    map::{
        self,
        GachaPoint,
    },
    network::{
        self,
        TargetNetwork,
    },
    rewards::{
        Rarity,
        Reward,
    },
    rpc::JsonRpcClient,
    ui,
    wallet::{
        BalanceInfo,
        WalletGateway,
        WalletSession,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::{
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time::{
        self,
        Instant,
    },
};
use tracing::{
    error,
    info,
    warn,
};

pub const DEFAULT_LOG_DIR: &str = "./logs";
/// A reveal never resolves sooner than this after check-in.
pub const MIN_REVEAL_DURATION: Duration = Duration::from_secs(2);
pub const CELEBRATION_DURATION: Duration = Duration::from_secs(3);
const MAX_ERRORS: usize = 50;
const TICK_INTERVAL: Duration = Duration::from_millis(250);

pub type DrawOutcome = Result<Reward, DrawError>;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub agent_url: Option<String>,
    pub rpc_url: Option<String>,
    pub contract: String,
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            agent_url: None,
            rpc_url: None,
            contract: DEFAULT_RANDOMNESS_CONTRACT.to_string(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

impl AppConfig {
    pub fn network(&self) -> TargetNetwork {
        let network = network::flow_evm_testnet();
        match &self.rpc_url {
            Some(url) => network.with_rpc_url(url.clone()),
            None => network,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum RevealState {
    #[default]
    Hidden,
    Revealing,
    Revealed(Reward),
}

impl RevealState {
    pub fn is_open(&self) -> bool {
        !matches!(self, RevealState::Hidden)
    }
}

#[derive(Clone, Debug)]
pub enum AppEvent {
    ConnectWallet,
    RefreshBalance,
    CheckIn,
    CloseReveal,
    DrawFinished(DrawOutcome),
    Tick,
}

/// Read-only view of the application the UI renders.
#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub network: TargetNetwork,
    pub has_agent: bool,
    pub session: WalletSession,
    pub balance: BalanceInfo,
    pub explorer_url: Option<String>,
    pub points: Vec<GachaPoint>,
    pub nearby: Option<GachaPoint>,
    pub can_check_in: bool,
    pub reveal: RevealState,
    pub celebrating: bool,
    pub collection: Vec<(Rarity, Vec<CollectionItem>)>,
    pub collection_size: usize,
    pub status: String,
    pub errors: Vec<String>,
}

pub struct AppController<A, S> {
    gateway: WalletGateway<A>,
    drawer: Arc<RewardDrawer<S>>,
    draw_tx: mpsc::UnboundedSender<DrawOutcome>,
    collection: Collection,
    points: Vec<GachaPoint>,
    reveal: RevealState,
    celebrate_until: Option<Instant>,
    status: String,
    errors: Vec<String>,
}

impl<A, S> AppController<A, S>
where
    A: SigningAgent,
    S: RandomnessSource + Send + Sync + 'static,
{
    /// Draw outcomes are delivered on `draw_tx`; the owner of the receiver
    /// feeds them back as [`AppEvent::DrawFinished`].
    pub fn new(
        gateway: WalletGateway<A>,
        drawer: RewardDrawer<S>,
        draw_tx: mpsc::UnboundedSender<DrawOutcome>,
    ) -> Self {
        Self {
            gateway,
            drawer: Arc::new(drawer),
            draw_tx,
            collection: Collection::starter(),
            points: map::gacha_points(),
            reveal: RevealState::Hidden,
            celebrate_until: None,
            status: String::from("Ready"),
            errors: Vec::new(),
        }
    }

    pub fn with_points(mut self, points: Vec<GachaPoint>) -> Self {
        self.points = points;
        self
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn reveal(&self) -> &RevealState {
        &self.reveal
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_celebrating(&self) -> bool {
        self.celebrate_until
            .is_some_and(|deadline| Instant::now() < deadline)
    }

    pub fn nearby_point(&self) -> Option<&GachaPoint> {
        map::nearby_point(&self.points)
    }

    pub fn can_check_in(&self) -> bool {
        self.nearby_point().is_some() && self.gateway.session().connected
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.errors.clear();
    }

    fn push_error(&mut self, message: String) {
        error!("{}", message);
        self.errors.push(message);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }

    /// Picks up an account the agent already authorized. Never prompts.
    pub async fn restore_session(&mut self) {
        if let Some(session) = self.gateway.check_existing_session().await {
            let address = session.address.unwrap_or_default();
            self.set_status(format!("Welcome back, {}", short_address(&address)));
        }
    }

    pub async fn handle(&mut self, event: AppEvent) {
        match event {
            AppEvent::ConnectWallet => self.connect_wallet().await,
            AppEvent::RefreshBalance => {
                if self.gateway.refresh_balance().await.is_none() {
                    self.set_status("Connect a wallet to see its balance");
                }
            }
            AppEvent::CheckIn => self.check_in(),
            AppEvent::CloseReveal => self.close_reveal(),
            AppEvent::DrawFinished(outcome) => self.finish_draw(outcome),
            AppEvent::Tick => {
                if self
                    .celebrate_until
                    .is_some_and(|deadline| Instant::now() >= deadline)
                {
                    self.celebrate_until = None;
                }
            }
        }
    }

    async fn connect_wallet(&mut self) {
        match self.gateway.connect().await {
            Ok(session) => {
                let address = session.address.unwrap_or_default();
                self.set_status(format!(
                    "Connected {} on {}",
                    short_address(&address),
                    self.gateway.network().name
                ));
            }
            Err(err) => {
                warn!(?err, "failed to connect wallet");
                self.status = String::from("Wallet disconnected");
                self.push_error(format!("Failed to connect wallet: {err}"));
            }
        }
    }

    fn check_in(&mut self) {
        if self.reveal.is_open() {
            self.set_status("A reward is already being revealed");
            return;
        }
        if !self.gateway.session().connected {
            self.push_error(String::from("Connect a wallet to check in"));
            return;
        }
        let Some(point) = self.nearby_point().map(|p| p.name) else {
            self.push_error(String::from("Move closer to a gacha point to check in"));
            return;
        };
        info!(point, "checking in");
        self.reveal = RevealState::Revealing;
        self.set_status(format!("Checking in at {point}..."));
        self.spawn_draw();
    }

    fn spawn_draw(&self) {
        let drawer = Arc::clone(&self.drawer);
        let draw_tx = self.draw_tx.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let outcome = drawer.draw().await;
            time::sleep_until(started + MIN_REVEAL_DURATION).await;
            if draw_tx.send(outcome).is_err() {
                warn!("draw result receiver dropped");
            }
        });
    }

    fn finish_draw(&mut self, outcome: DrawOutcome) {
        match outcome {
            Ok(reward) => {
                let point = self
                    .nearby_point()
                    .map(|p| p.name)
                    .unwrap_or("an unknown location");
                self.collection.record(&reward, point);
                if reward.rarity.is_celebrated() {
                    self.celebrate_until = Some(Instant::now() + CELEBRATION_DURATION);
                }
                let origin = if reward.sourced_on_chain {
                    "on-chain"
                } else {
                    "local"
                };
                self.set_status(format!(
                    "Found {} ({}, {} draw)",
                    reward.name, reward.rarity, origin
                ));
                self.reveal = RevealState::Revealed(reward);
            }
            Err(err) => {
                self.reveal = RevealState::Hidden;
                self.push_error(format!("Check-in failed: {err}"));
            }
        }
    }

    fn close_reveal(&mut self) {
        match self.reveal {
            RevealState::Revealing => {
                self.set_status("Your reward is still being revealed");
            }
            RevealState::Revealed(_) => {
                self.reveal = RevealState::Hidden;
                self.celebrate_until = None;
            }
            RevealState::Hidden => {}
        }
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let session = self.gateway.session().clone();
        let explorer_url = session
            .address
            .as_deref()
            .map(|address| self.gateway.network().explorer_address_url(address));
        AppSnapshot {
            network: self.gateway.network().clone(),
            has_agent: self.gateway.has_agent(),
            balance: self.gateway.balance().clone(),
            explorer_url,
            session,
            points: self.points.clone(),
            nearby: self.nearby_point().cloned(),
            can_check_in: self.can_check_in(),
            reveal: self.reveal.clone(),
            celebrating: self.is_celebrating(),
            collection: self
                .collection
                .grouped()
                .into_iter()
                .map(|(rarity, items)| (rarity, items.into_iter().cloned().collect()))
                .collect(),
            collection_size: self.collection.len(),
            status: self.status.clone(),
            errors: self.errors.clone(),
        }
    }
}

/// `0x1234…abcd` form for status lines.
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    match (address.get(..6), address.get(address.len() - 4..)) {
        (Some(head), Some(tail)) => format!("{head}…{tail}"),
        _ => address.to_string(),
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let network = config.network();
    let agent = config
        .agent_url
        .as_deref()
        .map(HttpSigningAgent::new)
        .transpose()
        .wrap_err("failed to set up signing agent client")?;
    // Contract reads go through the agent when there is one, otherwise
    // straight to the network's public endpoint.
    let reader = match &agent {
        Some(agent) => agent.rpc().clone(),
        None => JsonRpcClient::new(network.rpc_url.clone())
            .wrap_err("failed to set up network RPC client")?,
    };
    info!(
        network = %network,
        reader = %reader,
        contract = %config.contract,
        agent = %agent
            .as_ref()
            .map_or_else(|| String::from("none"), ToString::to_string),
        "starting geo-gacha"
    );
    let contract = RandomnessContract::new(reader, config.contract.clone());
    let gateway = WalletGateway::new(agent, network);
    let (draw_tx, mut draw_rx) = mpsc::unbounded_channel();
    let mut controller = AppController::new(gateway, RewardDrawer::new(contract), draw_tx);
    controller.restore_session().await;

    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();
    ui::terminal_enter(&mut ui_state)?;
    info!("UI ready");
    let res = run_loop(controller, &mut ui_state, &mut input_events, &mut draw_rx).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop<A, S>(
    mut controller: AppController<A, S>,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEvents,
    draw_rx: &mut mpsc::UnboundedReceiver<DrawOutcome>,
) -> Result<()>
where
    A: SigningAgent,
    S: RandomnessSource + Send + Sync + 'static,
{
    let mut ticker = time::interval(TICK_INTERVAL);
    ui::draw(ui_state, &controller.snapshot()).wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                controller.handle(AppEvent::Tick).await;
            }
            Some(outcome) = draw_rx.recv() => {
                controller.handle(AppEvent::DrawFinished(outcome)).await;
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::ConnectWallet => {
                        controller.set_status("Connecting wallet...");
                        ui::draw(ui_state, &controller.snapshot())
                            .wrap_err("draw before connecting failed")?;
                        controller.handle(AppEvent::ConnectWallet).await;
                    }
                    ui::UserEvent::RefreshBalance => {
                        controller.handle(AppEvent::RefreshBalance).await;
                    }
                    ui::UserEvent::CheckIn => {
                        controller.handle(AppEvent::CheckIn).await;
                    }
                    ui::UserEvent::CloseReveal => {
                        controller.handle(AppEvent::CloseReveal).await;
                    }
                }
            }
        }
        ui::draw(ui_state, &controller.snapshot()).wrap_err("draw failed")?;
    }
    info!("shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn short_address__keeps_head_and_tail() {
        assert_eq!(
            short_address("0x00000000000000000000000000000000000a11ce"),
            "0x0000…11ce"
        );
        assert_eq!(short_address("0x1234"), "0x1234");
    }

    #[test]
    fn app_config__rpc_override_only_touches_rpc_url() {
        // given
        let config = AppConfig {
            rpc_url: Some(String::from("http://localhost:8545")),
            ..AppConfig::default()
        };

        // when
        let network = config.network();

        // then
        assert_eq!(network.rpc_url, "http://localhost:8545");
        assert_eq!(network.chain_id, 545);
        assert_eq!(config.contract, DEFAULT_RANDOMNESS_CONTRACT);
    }
}
