// Channel settlement library resolving lightning channel closings onchain
// by LNP/BP Association (https://lnp-bp.org)
//
// Written in 2022 by
//     Dr. Maxim Orlovsky <orlovsky@lnp-bp.org>
//
// This software is distributed without any warranty.
//
// You should have received a copy of the Apache-2.0 License
// along with this software.
// If not, see <https://opensource.org/licenses/Apache-2.0>.

//! Static table of the networks addresses may be resolved against.

use std::str::FromStr;

use bitcoin::Network;

/// Protocol parameters of a network which are relevant for address encoding.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct NetworkParams {
    /// Canonical name of the network
    pub name: &'static str,
    /// Matching rust-bitcoin network
    pub network: Network,
    /// Human-readable part of bech32 and bech32m addresses
    pub bech32_hrp: &'static str,
    /// Base58 version byte of P2PKH addresses
    pub p2pkh_prefix: u8,
    /// Base58 version byte of P2SH addresses
    pub p2sh_prefix: u8,
}

const MAINNET: NetworkParams = NetworkParams {
    name: "mainnet",
    network: Network::Bitcoin,
    bech32_hrp: "bc",
    p2pkh_prefix: 0x00,
    p2sh_prefix: 0x05,
};

const TESTNET: NetworkParams = NetworkParams {
    name: "testnet",
    network: Network::Testnet,
    bech32_hrp: "tb",
    p2pkh_prefix: 0x6f,
    p2sh_prefix: 0xc4,
};

const SIGNET: NetworkParams = NetworkParams {
    name: "signet",
    network: Network::Signet,
    bech32_hrp: "tb",
    p2pkh_prefix: 0x6f,
    p2sh_prefix: 0xc4,
};

const REGTEST: NetworkParams = NetworkParams {
    name: "regtest",
    network: Network::Regtest,
    bech32_hrp: "bcrt",
    p2pkh_prefix: 0x6f,
    p2sh_prefix: 0xc4,
};

/// Bitcoin networks a channel may be opened on
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "lowercase")
)]
pub enum ChainNetwork {
    /// Bitcoin mainnet
    #[display("mainnet")]
    Mainnet,

    /// Bitcoin testnet3
    #[display("testnet")]
    Testnet,

    /// Bitcoin signet
    #[display("signet")]
    Signet,

    /// Bitcoin regtest networks
    #[display("regtest")]
    Regtest,
}

impl Default for ChainNetwork {
    fn default() -> Self { ChainNetwork::Testnet }
}

impl ChainNetwork {
    /// All known networks
    pub const ALL: [ChainNetwork; 4] = [
        ChainNetwork::Mainnet,
        ChainNetwork::Testnet,
        ChainNetwork::Signet,
        ChainNetwork::Regtest,
    ];

    /// Returns address encoding parameters of the network
    pub fn params(self) -> &'static NetworkParams {
        match self {
            ChainNetwork::Mainnet => &MAINNET,
            ChainNetwork::Testnet => &TESTNET,
            ChainNetwork::Signet => &SIGNET,
            ChainNetwork::Regtest => &REGTEST,
        }
    }

    /// Human-readable part expected in segwit addresses of this network
    #[inline]
    pub fn bech32_hrp(self) -> &'static str { self.params().bech32_hrp }

    /// Rust-bitcoin network matching this one
    #[inline]
    pub fn bitcoin_network(self) -> Network { self.params().network }

    /// Detects whether the network is a kind of test network (testnet, signet,
    /// regtest).
    pub fn is_testnet(self) -> bool { self != ChainNetwork::Mainnet }
}

/// Error parsing network name
#[derive(Clone, PartialEq, Eq, Hash, Debug, Display, Error)]
#[display(doc_comments)]
/// unknown network `{0}`; expected `mainnet`, `testnet`, `signet` or `regtest`
pub struct UnknownNetwork(pub String);

impl FromStr for ChainNetwork {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "mainnet" | "bitcoin" | "btc" | "main" => ChainNetwork::Mainnet,
            "testnet" | "testnet3" | "btctestnet" | "test" => ChainNetwork::Testnet,
            "signet" | "btcsignet" => ChainNetwork::Signet,
            "regtest" | "btcregtest" => ChainNetwork::Regtest,
            _ => return Err(UnknownNetwork(s.to_owned())),
        })
    }
}

impl From<ChainNetwork> for Network {
    fn from(network: ChainNetwork) -> Self { network.bitcoin_network() }
}

impl From<Network> for ChainNetwork {
    fn from(network: Network) -> Self {
        match network {
            Network::Bitcoin => ChainNetwork::Mainnet,
            Network::Testnet => ChainNetwork::Testnet,
            Network::Signet => ChainNetwork::Signet,
            Network::Regtest => ChainNetwork::Regtest,
        }
    }
}
