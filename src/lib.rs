pub mod abi;
pub mod agent;
pub mod client;
pub mod collection;
pub mod contract;
pub mod draw;
pub mod map;
pub mod network;
pub mod rewards;
pub mod rpc;
pub mod test_helpers;
pub mod ui;
pub mod wallet;
