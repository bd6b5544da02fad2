//! Solidity interfaces of the contracts the router reads.

use alloy::sol;
use alloy::sol_types::SolCall;

use crate::error::RouterError;

sol! {
    /// Uniswap V2 style factory.
    #[sol(rpc)]
    interface IUniswapV2Factory {
        /// Pair contract for two tokens, or the zero address.
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }

    /// Uniswap V2 style pair.
    #[sol(rpc)]
    interface IUniswapV2Pair {
        function getReserves() external view returns (
            uint112 reserve0,
            uint112 reserve1,
            uint32 blockTimestampLast
        );
        function token0() external view returns (address);
    }

    /// ERC-20 metadata extension.
    #[sol(rpc)]
    interface IERC20Metadata {
        function symbol() external view returns (string);
        function name() external view returns (string);
        function decimals() external view returns (uint8);
    }
}

/// Decodes the return data of `symbol()` or `name()`.
///
/// Some early tokens return a NUL-padded `bytes32` instead of `string`.
pub(super) fn decode_text(raw: &[u8]) -> Result<String, RouterError> {
    if raw.len() == 32 {
        let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        let text = raw.get(..end).unwrap_or_default();
        return Ok(String::from_utf8_lossy(text).into_owned());
    }
    IERC20Metadata::symbolCall::abi_decode_returns(raw)
        .map_err(|e| RouterError::Rpc(format!("malformed string return: {e}")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use alloy::primitives::U256;

    use super::*;

    fn word(value: u64) -> [u8; 32] {
        U256::from(value).to_be_bytes::<32>()
    }

    fn padded(text: &[u8]) -> Vec<u8> {
        text.iter()
            .copied()
            .chain(std::iter::repeat(0))
            .take(32)
            .collect()
    }

    #[test]
    fn string_return_decodes() {
        let mut raw = word(32).to_vec();
        raw.extend(word(4));
        raw.extend(padded(b"USDC"));
        let Ok(text) = decode_text(&raw) else {
            panic!("well-formed string");
        };
        assert_eq!(text, "USDC");
    }

    #[test]
    fn bytes32_return_is_trimmed() {
        let Ok(text) = decode_text(&padded(b"MKR")) else {
            panic!("bytes32 symbol");
        };
        assert_eq!(text, "MKR");
    }

    #[test]
    fn hostile_offset_is_rejected() {
        let mut raw = word(u64::MAX).to_vec();
        raw.extend(word(4));
        assert!(matches!(decode_text(&raw), Err(RouterError::Rpc(_))));

        let mut long_length = word(32).to_vec();
        long_length.extend(word(u64::MAX));
        assert!(matches!(decode_text(&long_length), Err(RouterError::Rpc(_))));
    }

    #[test]
    fn truncated_return_is_rejected() {
        assert!(matches!(decode_text(&[0u8; 31]), Err(RouterError::Rpc(_))));
    }
}
