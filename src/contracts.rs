//! SuperETH bridge contract ABI definition
//!
//! Uses alloy's sol! macro to generate type-safe bindings. The orchestrator
//! only exercises crosschainMint/crosschainBurn/deposit/withdraw/balanceOf;
//! the remaining functions are part of the deployed ABI surface.

use alloy::sol;

sol! {
    /// SuperETH (sETH) cross-chain bridge token
    ///
    /// crosschainMint/crosschainBurn are restricted to the designated aiAgent
    /// account; a call from any other signer reverts on-chain.
    #[sol(rpc)]
    contract SuperEth {
        function aiAgent() external view returns (address);
        function owner() external view returns (address);

        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);

        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
        function transfer(address to, uint256 value) external returns (bool);
        function transferFrom(address from, address to, uint256 value) external returns (bool);

        /// Mint bridged sETH to an address. aiAgent only.
        function crosschainMint(address to, uint256 amount) external;

        /// Burn bridged sETH from an address. aiAgent only.
        function crosschainBurn(address from, uint256 amount) external;

        /// Deposit native ETH, minting the same amount of sETH to the sender.
        function deposit() external payable;

        /// Burn sETH and release the same amount of native ETH.
        function withdraw(uint256 amount) external;
    }
}
