//! Textual command boundary
//!
//! Line-oriented commands over the session, for the interactive gateway in
//! `main`. Each line is a command word followed by whitespace-delimited
//! arguments; parsing produces a typed `Command` so dispatch cannot see a
//! malformed call. Dispatch never returns an error: every outcome, success or
//! failure, is rendered as a status string for the operator.

use alloy::primitives::{Address, U256};

use crate::error::BridgeError;
use crate::orchestrator::StrandedBridge;
use crate::session::{BridgeSession, SwitchOutcome};

/// One parsed operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mint { to: Address, amount: U256 },
    Burn { from: Address, amount: U256 },
    BalanceOf { address: Address },
    Deposit { eth: String },
    Withdraw { amount: U256 },
    /// `None` lists the supported networks instead of switching.
    Switch { chain_id: Option<String> },
    Bridge {
        source: String,
        dest: String,
        address: Address,
        amount: U256,
    },
    CurrentNetwork,
    VerifyChains,
    Help,
}

fn parse_address(raw: &str) -> Result<Address, BridgeError> {
    raw.parse()
        .map_err(|_| BridgeError::InvalidArgument(format!("Invalid address: {}", raw)))
}

fn parse_amount(raw: &str) -> Result<U256, BridgeError> {
    U256::from_str_radix(raw, 10)
        .map_err(|_| BridgeError::InvalidArgument(format!("Invalid token amount: {}", raw)))
}

impl Command {
    /// Parse one input line. The command word is case-insensitive; arguments
    /// are whitespace-delimited.
    pub fn parse(line: &str) -> Result<Self, BridgeError> {
        let mut parts = line.split_whitespace();
        let word = parts
            .next()
            .ok_or_else(|| BridgeError::InvalidArgument("Empty command".to_string()))?
            .to_lowercase();
        let args: Vec<&str> = parts.collect();

        let arity = |expected: usize| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(BridgeError::InvalidArgument(format!(
                    "'{}' takes {} argument(s), got {}",
                    word,
                    expected,
                    args.len()
                )))
            }
        };

        match word.as_str() {
            "mint" => {
                arity(2)?;
                Ok(Command::Mint {
                    to: parse_address(args[0])?,
                    amount: parse_amount(args[1])?,
                })
            }
            "burn" => {
                arity(2)?;
                Ok(Command::Burn {
                    from: parse_address(args[0])?,
                    amount: parse_amount(args[1])?,
                })
            }
            "balance" => {
                arity(1)?;
                Ok(Command::BalanceOf {
                    address: parse_address(args[0])?,
                })
            }
            "deposit" => {
                arity(1)?;
                Ok(Command::Deposit {
                    eth: args[0].to_string(),
                })
            }
            "withdraw" => {
                arity(1)?;
                Ok(Command::Withdraw {
                    amount: parse_amount(args[0])?,
                })
            }
            "switch" => match args.as_slice() {
                [] => Ok(Command::Switch { chain_id: None }),
                [chain_id] => Ok(Command::Switch {
                    chain_id: Some((*chain_id).to_string()),
                }),
                _ => Err(BridgeError::InvalidArgument(
                    "'switch' takes at most one argument".to_string(),
                )),
            },
            "bridge" => {
                arity(4)?;
                Ok(Command::Bridge {
                    source: args[0].to_string(),
                    dest: args[1].to_string(),
                    address: parse_address(args[2])?,
                    amount: parse_amount(args[3])?,
                })
            }
            "network" => {
                arity(0)?;
                Ok(Command::CurrentNetwork)
            }
            "verify" => {
                arity(0)?;
                Ok(Command::VerifyChains)
            }
            "help" => Ok(Command::Help),
            other => Err(BridgeError::InvalidArgument(format!(
                "Unknown command: {}",
                other
            ))),
        }
    }
}

const HELP_TEXT: &str = "\
Commands:
  mint <address> <amount>                     mint tokens on the active chain
  burn <address> <amount>                     burn tokens on the active chain
  balance <address>                           token balance on the active chain
  deposit <eth>                               wrap native ETH into tokens
  withdraw <amount>                           unwrap tokens back to native ETH
  switch [chain_id]                           switch network, or list networks
  bridge <source> <dest> <address> <amount>   burn on source, mint on dest
  network                                     show the active network
  verify                                      check every supported chain
  help                                        this text";

/// Execute a command against the session and render the outcome.
pub async fn dispatch(session: &BridgeSession, command: Command) -> String {
    match run(session, command).await {
        Ok(message) => message,
        Err(e) => render_error(&e),
    }
}

fn render_error(err: &BridgeError) -> String {
    if let Some(stranded) = StrandedBridge::from_error(err) {
        return format!(
            "Error: {}\nBurn transaction on chain {}: 0x{:x}\nComplete manually: mint {} tokens to {} on chain {}",
            err,
            stranded.source_chain,
            stranded.burn_tx_hash,
            stranded.amount,
            stranded.address,
            stranded.dest_chain
        );
    }
    format!("Error: {}", err)
}

async fn run(session: &BridgeSession, command: Command) -> Result<String, BridgeError> {
    match command {
        Command::Mint { to, amount } => {
            let result = session.mint(to, amount).await?;
            let name = chain_name(session, &result.chain_id);
            Ok(format!(
                "Successfully minted {} tokens to {} on {}.\nTransaction: {}",
                amount, to, name, result.explorer_url
            ))
        }
        Command::Burn { from, amount } => {
            let result = session.burn(from, amount).await?;
            let name = chain_name(session, &result.chain_id);
            Ok(format!(
                "Successfully burned {} tokens from {} on {}.\nTransaction: {}",
                amount, from, name, result.explorer_url
            ))
        }
        Command::BalanceOf { address } => {
            let balance = session.balance_of(address).await?;
            let chain_id = session.active_chain_id().await;
            Ok(format!(
                "Balance of {} on {}: {} tokens",
                address,
                chain_name(session, &chain_id),
                balance
            ))
        }
        Command::Deposit { eth } => {
            let result = session.deposit(&eth).await?;
            Ok(format!(
                "Successfully deposited {} ETH on {}.\nTransaction: {}",
                eth,
                chain_name(session, &result.chain_id),
                result.explorer_url
            ))
        }
        Command::Withdraw { amount } => {
            let result = session.withdraw(amount).await?;
            Ok(format!(
                "Successfully withdrew {} tokens on {}.\nTransaction: {}",
                amount,
                chain_name(session, &result.chain_id),
                result.explorer_url
            ))
        }
        Command::Switch { chain_id: None } => Ok(list_networks(session)),
        Command::Switch {
            chain_id: Some(target),
        } => match session.switch(&target).await? {
            SwitchOutcome::AlreadyActive { chain_id } => Ok(format!(
                "Already on {} ({})",
                chain_name(session, &chain_id),
                chain_id
            )),
            SwitchOutcome::Switched {
                chain_id,
                chain_name,
                native_balance,
            } => Ok(format!(
                "Switched to {} ({}). Native balance: {} wei",
                chain_name, chain_id, native_balance
            )),
        },
        Command::Bridge {
            source,
            dest,
            address,
            amount,
        } => {
            let receipt = session.bridge(&source, &dest, address, amount).await?;
            Ok(format!(
                "Successfully bridged {} tokens for {} from {} to {}.\nBurn: {}\nMint: {}",
                amount,
                address,
                chain_name(session, &receipt.source_chain),
                chain_name(session, &receipt.dest_chain),
                receipt.burn.explorer_url,
                receipt.mint.explorer_url
            ))
        }
        Command::CurrentNetwork => {
            let info = session.current_network().await?;
            let mut out = format!(
                "Active network: {} ({})\nAgent address: {}",
                info.chain_name, info.chain_id, info.signer_address
            );
            if info.degraded {
                out.push_str(&format!(
                    "\nWARNING: provider reports chain {} instead of {}",
                    info.reported_chain, info.chain_id
                ));
            }
            Ok(out)
        }
        Command::VerifyChains => {
            let checks = session.verify_chains().await;
            let mut lines = Vec::with_capacity(checks.len());
            for check in checks {
                match check.outcome {
                    Ok(balance) => lines.push(format!(
                        "✅ {} ({}): {} tokens",
                        check.chain_name, check.chain_id, balance
                    )),
                    Err(reason) => lines.push(format!(
                        "❌ {} ({}): {}",
                        check.chain_name, check.chain_id, reason
                    )),
                }
            }
            Ok(lines.join("\n"))
        }
        Command::Help => Ok(HELP_TEXT.to_string()),
    }
}

fn chain_name(session: &BridgeSession, chain_id: &str) -> String {
    session
        .registry()
        .descriptor_for(chain_id)
        .map(|d| d.name.clone())
        .unwrap_or_else(|_| chain_id.to_string())
}

fn list_networks(session: &BridgeSession) -> String {
    let mut lines = vec!["Supported networks:".to_string()];
    for descriptor in session.registry().descriptors() {
        lines.push(format!("  {} - {}", descriptor.chain_id, descriptor.name));
    }
    lines.push("Usage: switch <chain_id>".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_session;

    #[test]
    fn test_parse_mint() {
        let command = Command::parse(
            "mint 0x1111111111111111111111111111111111111111 250",
        )
        .unwrap();
        assert_eq!(
            command,
            Command::Mint {
                to: Address::repeat_byte(0x11),
                amount: U256::from(250)
            }
        );
    }

    #[test]
    fn test_parse_is_case_insensitive_on_command_word() {
        assert_eq!(
            Command::parse("NETWORK").unwrap(),
            Command::CurrentNetwork
        );
    }

    #[test]
    fn test_parse_switch_without_argument() {
        assert_eq!(
            Command::parse("switch").unwrap(),
            Command::Switch { chain_id: None }
        );
        assert_eq!(
            Command::parse("switch 84532").unwrap(),
            Command::Switch {
                chain_id: Some("84532".to_string())
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_arity_and_address() {
        assert!(Command::parse("mint 0x1111111111111111111111111111111111111111").is_err());
        assert!(Command::parse("mint not-an-address 5").is_err());
        assert!(Command::parse("").is_err());
        assert!(Command::parse("teleport somewhere").is_err());
    }

    #[tokio::test]
    async fn test_dispatch_mint_renders_explorer_link() {
        let (session, _factory) = test_session("84532").await;
        let out = dispatch(
            &session,
            Command::Mint {
                to: Address::repeat_byte(0x11),
                amount: U256::from(100),
            },
        )
        .await;

        assert!(out.starts_with("Successfully minted 100 tokens"));
        assert!(out.contains("Base Sepolia"));
        assert!(out.contains("https://sepolia.basescan.org/tx/0x"));
    }

    #[tokio::test]
    async fn test_dispatch_unsupported_switch_renders_error() {
        let (session, _factory) = test_session("84532").await;
        let out = dispatch(
            &session,
            Command::Switch {
                chain_id: Some("99999".to_string()),
            },
        )
        .await;

        assert!(out.starts_with("Error:"));
        assert!(out.contains("not supported"));
        assert!(out.contains("84532"));
    }

    #[tokio::test]
    async fn test_dispatch_switch_without_argument_lists_networks() {
        let (session, _factory) = test_session("84532").await;
        let out = dispatch(&session, Command::Switch { chain_id: None }).await;

        assert!(out.contains("Supported networks:"));
        assert!(out.contains("84532 - Base Sepolia"));
        assert!(out.contains("11155420 - Optimism Sepolia"));
    }

    #[tokio::test]
    async fn test_dispatch_partial_bridge_renders_recovery_instructions() {
        let (session, factory) = test_session("84532").await;
        let user = Address::repeat_byte(0x22);
        session.mint(user, U256::from(100)).await.unwrap();
        factory.fail_submit("11155420", "crosschainMint");

        let out = dispatch(
            &session,
            Command::Bridge {
                source: "84532".to_string(),
                dest: "11155420".to_string(),
                address: user,
                amount: U256::from(100),
            },
        )
        .await;

        assert!(out.starts_with("Error:"));
        assert!(out.contains("Burn transaction on chain 84532: 0x"));
        assert!(out.contains("Complete manually"));
    }
}
