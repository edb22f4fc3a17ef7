//! Chain-policy parameters governing checkpoints, maturity and staking.

use serde::{Deserialize, Serialize};

/// Protocol constants. Defaults mirror mainnet policy; tests override
/// individual fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// First height at which zero-knowledge coins are active. Checkpoints
    /// and witness requests below this height are rejected.
    pub activation_height: u32,
    /// Checkpoints fall on multiples of this interval.
    pub checkpoint_interval: u32,
    /// A mint is folded into a checkpoint only once it is this many
    /// blocks deep below the checkpoint height.
    pub mint_maturity: u32,
    /// Minimum number of foreign mints a witness must fold before it is
    /// considered to hide the coin.
    pub min_anonymity_set: u32,
    /// Depth below the tip used when a direct mint-to-stake resolves its
    /// stale reference block.
    pub stake_min_depth: u32,
    /// Seconds a stake-modifier source block must trail its reference.
    pub modifier_window_secs: i64,
    /// Reservation-pool lookahead size.
    pub pool_lookahead: u32,
}

impl Default for ProtocolParams {
    fn default() -> ProtocolParams {
        ProtocolParams {
            activation_height: 100,
            checkpoint_interval: 10,
            mint_maturity: 20,
            min_anonymity_set: 5,
            stake_min_depth: 120,
            modifier_window_secs: 60 * 60,
            pool_lookahead: 20,
        }
    }
}

impl ProtocolParams {
    /// Round `height` down to the checkpoint grid.
    pub fn checkpoint_floor(&self, height: u32) -> u32 {
        height - height % self.checkpoint_interval
    }

    /// The first checkpoint height at or after activation.
    pub fn first_checkpoint(&self) -> u32 {
        let rounded = self.checkpoint_floor(self.activation_height);
        if rounded < self.activation_height {
            rounded + self.checkpoint_interval
        } else {
            rounded
        }
    }

    /// Mints at or below this height are folded into the checkpoint at
    /// `checkpoint_height`.
    pub fn maturity_cutoff(&self, checkpoint_height: u32) -> u32 {
        checkpoint_height.saturating_sub(self.mint_maturity)
    }

    pub fn is_checkpoint_height(&self, height: u32) -> bool {
        height % self.checkpoint_interval == 0
    }
}
