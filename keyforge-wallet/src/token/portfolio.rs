//! Token holdings of a wallet

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::crypto::keys::Chain;
use crate::error::{Error, Result};
use crate::state::StateHandle;
use super::{TokenGateway, UserTokenBalance};

pub struct TokenPortfolio {
    state: StateHandle,
    gateway: Arc<dyn TokenGateway>,
}

impl TokenPortfolio {
    pub fn new(state: StateHandle, gateway: Arc<dyn TokenGateway>) -> Self {
        Self { state, gateway }
    }

    /// Re-read every nonzero holding of a Solana wallet
    ///
    /// The stored list is replaced wholesale. Name and symbol are filled in
    /// for mints this wallet created.
    #[instrument(skip(self))]
    pub async fn refresh_token_balances(&self, wallet_id: &str) -> Result<Vec<UserTokenBalance>> {
        let wallet = self
            .state
            .wallet(wallet_id)
            .ok_or_else(|| Error::Validation(format!("Unknown wallet: {}", wallet_id)))?;
        if wallet.chain() != Chain::Solana {
            return Err(Error::Validation(format!("Wallet {} holds no SPL tokens", wallet_id)));
        }

        let accounts = self.gateway.owned_token_accounts(wallet.public_identifier()).await?;

        self.state.mutate(|s| {
            let balances: Vec<UserTokenBalance> = accounts
                .into_iter()
                .map(|account| {
                    let mut balance = UserTokenBalance::from(account);
                    if let Some(record) = s.token(&balance.mint_address) {
                        balance.name = Some(record.name.clone());
                        balance.symbol = Some(record.symbol.clone());
                    }
                    balance
                })
                .collect();
            debug!(count = balances.len(), "Token balances replaced");
            s.token_balances = balances.clone();
            balances
        })
    }

    /// Attach display metadata to a held mint; returns `false` if it is not held
    pub fn set_token_metadata(&self, mint: &str, name: &str, symbol: &str) -> Result<bool> {
        self.state.mutate(|s| {
            match s.token_balances.iter_mut().find(|b| b.mint_address == mint) {
                Some(balance) => {
                    balance.name = Some(name.to_string());
                    balance.symbol = Some(symbol.to_string());
                    true
                }
                None => false,
            }
        })
    }

    pub fn balances(&self) -> Vec<UserTokenBalance> {
        self.state.read(|s| s.token_balances.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::crypto::keys::KeyPair;
    use crate::provider::OwnedTokenAccount;
    use crate::token::TokenRecord;

    struct Holdings(Vec<OwnedTokenAccount>);

    #[async_trait]
    impl TokenGateway for Holdings {
        async fn minimum_balance_for_rent_exemption(&self, _data_len: usize) -> Result<u64> {
            unimplemented!()
        }

        async fn balance_lamports(&self, _address: &str) -> Result<u64> {
            unimplemented!()
        }

        async fn request_airdrop(&self, _address: &str, _lamports: u64) -> Result<String> {
            unimplemented!()
        }

        async fn wait_for_confirmation(&self, _signature: &str, _timeout: Duration) -> Result<()> {
            unimplemented!()
        }

        async fn create_mint(&self, _payer: &KeyPair, _decimals: u8, _freeze: bool) -> Result<String> {
            unimplemented!()
        }

        async fn get_or_create_associated_account(&self, _payer: &KeyPair, _mint: &str, _owner: &str) -> Result<String> {
            unimplemented!()
        }

        async fn mint_to(&self, _payer: &KeyPair, _mint: &str, _account: &str, _amount: u64) -> Result<String> {
            unimplemented!()
        }

        async fn mint_decimals(&self, _mint: &str) -> Result<u8> {
            unimplemented!()
        }

        async fn owned_token_accounts(&self, _owner: &str) -> Result<Vec<OwnedTokenAccount>> {
            Ok(self.0.clone())
        }
    }

    fn holding(mint: &str, raw_balance: u64) -> OwnedTokenAccount {
        OwnedTokenAccount {
            mint: mint.to_string(),
            token_account: format!("acct-{}", mint),
            raw_balance,
            decimals: 6,
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_and_backfills() {
        let state = StateHandle::in_memory();
        state
            .import_mnemonic("abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about")
            .unwrap();
        let wallet = state.create_wallet(Chain::Solana).unwrap();
        state
            .mutate(|s| {
                s.tokens.push(TokenRecord {
                    mint_address: "MintOwn".to_string(),
                    name: "Test Token".to_string(),
                    symbol: "TT".to_string(),
                    decimals: 6,
                    supply: 1_000_000_000,
                    freeze_authority: None,
                    mint_authority: None,
                    created_at: Utc::now(),
                });
                s.token_balances.push(UserTokenBalance::from(holding("MintStale", 1)));
            })
            .unwrap();

        let portfolio = TokenPortfolio::new(
            state.clone(),
            Arc::new(Holdings(vec![holding("MintOwn", 1_000_000_000), holding("MintOther", 5)])),
        );
        let balances = portfolio.refresh_token_balances(wallet.id()).await.unwrap();

        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].symbol.as_deref(), Some("TT"));
        assert_eq!(balances[0].ui_amount(), 1000.0);
        assert_eq!(balances[1].name, None);
        assert_eq!(portfolio.balances(), balances);

        assert!(portfolio.set_token_metadata("MintOther", "Other", "OTH").unwrap());
        assert!(!portfolio.set_token_metadata("MintStale", "Gone", "GONE").unwrap());
        assert_eq!(portfolio.balances()[1].symbol.as_deref(), Some("OTH"));
    }
}
