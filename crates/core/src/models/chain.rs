use serde::Serialize;

/// An EVM chain the portfolio API can aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupportedChain {
    /// EIP-155 chain id
    pub id: u64,

    /// Display name (e.g., "Ethereum", "BNB Chain")
    pub name: &'static str,

    /// Block explorer base URL
    pub explorer: &'static str,

    /// CoinGecko asset platform id, used for contract-address logo lookups
    pub coingecko_platform: &'static str,
}

/// Every chain the aggregator fans out to, in aggregation order.
///
/// Ordered by ascending chain id. Multi-chain results keep this order;
/// callers sort for display.
pub const SUPPORTED_CHAINS: [SupportedChain; 12] = [
    SupportedChain { id: 1, name: "Ethereum", explorer: "https://etherscan.io", coingecko_platform: "ethereum" },
    SupportedChain { id: 10, name: "Optimism", explorer: "https://optimistic.etherscan.io", coingecko_platform: "optimistic-ethereum" },
    SupportedChain { id: 56, name: "BNB Chain", explorer: "https://bscscan.com", coingecko_platform: "binance-smart-chain" },
    SupportedChain { id: 100, name: "Gnosis", explorer: "https://gnosisscan.io", coingecko_platform: "xdai" },
    SupportedChain { id: 130, name: "Unichain", explorer: "https://unichain.blockscout.com", coingecko_platform: "unichain" },
    SupportedChain { id: 137, name: "Polygon", explorer: "https://polygonscan.com", coingecko_platform: "polygon-pos" },
    SupportedChain { id: 146, name: "Sonic", explorer: "https://explorer.soniclabs.com", coingecko_platform: "sonic" },
    SupportedChain { id: 324, name: "ZKsync Era", explorer: "https://explorer.zksync.io", coingecko_platform: "zksync" },
    SupportedChain { id: 8453, name: "Base", explorer: "https://basescan.org", coingecko_platform: "base" },
    SupportedChain { id: 42161, name: "Arbitrum", explorer: "https://arbiscan.io", coingecko_platform: "arbitrum-one" },
    SupportedChain { id: 43114, name: "Avalanche", explorer: "https://snowtrace.io", coingecko_platform: "avalanche" },
    SupportedChain { id: 59144, name: "Linea", explorer: "https://lineascan.build", coingecko_platform: "linea" },
];

/// Look up a supported chain by id.
pub fn find_chain(chain_id: u64) -> Option<&'static SupportedChain> {
    SUPPORTED_CHAINS.iter().find(|c| c.id == chain_id)
}

pub fn is_supported(chain_id: u64) -> bool {
    find_chain(chain_id).is_some()
}

/// CoinGecko platform for a chain, if the chain is known.
pub fn coingecko_platform(chain_id: u64) -> Option<&'static str> {
    find_chain(chain_id).map(|c| c.coingecko_platform)
}

/// Display name for a chain; unknown chains render as "Chain {id}".
pub fn chain_name(chain_id: u64) -> String {
    find_chain(chain_id)
        .map(|c| c.name.to_string())
        .unwrap_or_else(|| format!("Chain {chain_id}"))
}
