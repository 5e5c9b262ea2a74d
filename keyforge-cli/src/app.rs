//! Wiring of configuration, storage and gateways into one application

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use keyforge_solana::SplTokenGateway;
use keyforge_wallet::provider::RpcGateway;
use keyforge_wallet::store::FileStore;
use keyforge_wallet::token::{AirdropService, TokenGateway, TokenPortfolio};
use keyforge_wallet::{Config, StateHandle, TokenWorkflowEngine, WalletSyncCoordinator};

pub struct App {
    pub state: StateHandle,
    pub sync: WalletSyncCoordinator,
    pub tokens: TokenWorkflowEngine,
    pub airdrop: AirdropService,
    pub portfolio: TokenPortfolio,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let store = Arc::new(FileStore::open(&config.state_dir)?);
        let state = StateHandle::open(store)?;
        info!(state_dir = %config.state_dir.display(), "State loaded");

        let gateway = RpcGateway::new(&config.solana_provider(), &config.ethereum_provider())?;
        let token_gateway: Arc<dyn TokenGateway> =
            Arc::new(SplTokenGateway::new(gateway.solana(), config.confirm_timeout()));
        let sync = WalletSyncCoordinator::new(state.clone(), Arc::new(gateway));

        Ok(Self {
            tokens: TokenWorkflowEngine::new(state.clone(), Arc::clone(&token_gateway))
                .with_fee_buffer(config.fee_buffer_lamports),
            airdrop: AirdropService::new(state.clone(), Arc::clone(&token_gateway))
                .with_sync(sync.clone())
                .with_timeouts(config.confirm_timeout(), config.airdrop_settle_delay()),
            portfolio: TokenPortfolio::new(state.clone(), token_gateway),
            sync,
            state,
        })
    }
}
