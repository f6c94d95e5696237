//! Manager configuration.

use std::fmt;
use std::str::FromStr;

use custodian_common::constants::{DEFAULT_AUCTION_WINDOW_SECS, MIN_AUCTION_WINDOW_SECS};
use custodian_common::{Address, CustodianError, Result};

/// Deployment network, selecting well-known collaborator addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Network {
    #[default]
    Mainnet,
    Rinkeby,
    /// Local fork of mainnet.
    Hardhat,
    /// Any other network; no presets.
    Other,
}

fn preset(address: &'static str) -> Address {
    address.parse().unwrap_or_default()
}

impl Network {
    /// Order-matching exchange.
    pub fn exchange_address(&self) -> Address {
        match self {
            Network::Rinkeby => preset("0xdd54d660178b28f6033a953b0e55073cfa7e3744"),
            Network::Mainnet | Network::Hardhat => preset("0x7f268357a8c2552623316e2562d90e642bb538e5"),
            Network::Other => Address::ZERO,
        }
    }

    /// Vault facility factory.
    pub fn vault_factory_address(&self) -> Address {
        match self {
            Network::Rinkeby => preset("0xbbc53022af15bb973ad906577c84784c47c14371"),
            Network::Mainnet | Network::Hardhat => preset("0xbe86f647b167567525ccaafcd6f881f1ee558216"),
            Network::Other => Address::ZERO,
        }
    }

    /// Registry of per-maker transfer proxies used by the exchange.
    pub fn proxy_registry_address(&self) -> Address {
        match self {
            Network::Rinkeby => preset("0xf57b2c51ded3a29e6891aba85459d600256cf317"),
            Network::Mainnet | Network::Hardhat => preset("0xa5409ec958c83c3f309868babaca7c86dcb077c1"),
            Network::Other => Address::ZERO,
        }
    }
}

impl FromStr for Network {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "mainnet" => Network::Mainnet,
            "rinkeby" => Network::Rinkeby,
            "hardhat" => Network::Hardhat,
            _ => Network::Other,
        })
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Mainnet => "mainnet",
            Network::Rinkeby => "rinkeby",
            Network::Hardhat => "hardhat",
            Network::Other => "other",
        };
        f.write_str(name)
    }
}

/// Main manager configuration.
///
/// The exchange and vault addresses are fixed once a manager is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Network the addresses belong to.
    pub network: Network,
    /// Address under which the custodian holds assets.
    pub custodian: Address,
    /// Initial controlling authority.
    pub authority: Address,
    /// Exchange that orders must be bound to.
    pub exchange: Address,
    /// Vault facility used for fallback disposal.
    pub vault_factory: Address,
    /// Initial auction window, in seconds.
    pub auction_window_secs: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::for_network(Network::default())
    }
}

impl ManagerConfig {
    /// Configuration with the network's preset collaborator addresses.
    /// Custodian and authority are left unset.
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            custodian: Address::ZERO,
            authority: Address::ZERO,
            exchange: network.exchange_address(),
            vault_factory: network.vault_factory_address(),
            auction_window_secs: DEFAULT_AUCTION_WINDOW_SECS,
        }
    }

    /// Set the custodian and authority identities.
    pub fn with_identity(mut self, custodian: Address, authority: Address) -> Self {
        self.custodian = custodian;
        self.authority = authority;
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let network = lookup("CUSTODIAN_NETWORK")
            .map(|n| n.parse().unwrap_or_default())
            .unwrap_or_default();
        let mut config = Self::for_network(network);

        let address = |key: &str| -> Result<Option<Address>> {
            lookup(key)
                .map(|v| {
                    v.parse()
                        .map_err(|e| CustodianError::Configuration(format!("{}: {}", key, e)))
                })
                .transpose()
        };

        if let Some(addr) = address("CUSTODIAN_ADDRESS")? {
            config.custodian = addr;
        }
        if let Some(addr) = address("CUSTODIAN_AUTHORITY")? {
            config.authority = addr;
        }
        if let Some(addr) = address("CUSTODIAN_EXCHANGE")? {
            config.exchange = addr;
        }
        if let Some(addr) = address("CUSTODIAN_VAULT_FACTORY")? {
            config.vault_factory = addr;
        }
        if let Some(secs) = lookup("CUSTODIAN_AUCTION_WINDOW_SECS") {
            config.auction_window_secs = secs.trim().parse().map_err(|_| {
                CustodianError::Configuration(format!("CUSTODIAN_AUCTION_WINDOW_SECS: invalid value {}", secs))
            })?;
        }

        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("custodian", self.custodian),
            ("authority", self.authority),
            ("exchange", self.exchange),
            ("vault factory", self.vault_factory),
        ];
        for (name, addr) in required {
            if addr.is_zero() {
                return Err(CustodianError::Configuration(format!(
                    "{} address cannot be zero",
                    name
                )));
            }
        }

        if self.auction_window_secs < MIN_AUCTION_WINDOW_SECS {
            return Err(CustodianError::InvalidDuration {
                requested: self.auction_window_secs,
                minimum: MIN_AUCTION_WINDOW_SECS,
            });
        }

        Ok(())
    }
}
