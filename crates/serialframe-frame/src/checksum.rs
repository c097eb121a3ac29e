//! Single-byte frame checksums.
//!
//! The checksum covers the address byte, the length byte and the message.
//! Which function a device uses is a property of the device, so it is
//! pluggable through [`FrameConfig`](crate::FrameConfig).

use std::fmt;

use crate::codec::START_BYTE;

/// A single-byte validation function over `(address, length, message)`.
pub trait Checksum: fmt::Debug + Send + Sync {
    fn compute(&self, address: u8, length: u8, message: &[u8]) -> u8;
}

/// The byte that brings the sum of every frame byte, start byte included, to zero.
///
/// This is the default and matches captured device traffic:
/// `FF 02 04 1B 01 01 01` is followed by `DD`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TwosComplementSum;

impl Checksum for TwosComplementSum {
    fn compute(&self, address: u8, length: u8, message: &[u8]) -> u8 {
        message
            .iter()
            .fold(
                START_BYTE.wrapping_add(address).wrapping_add(length),
                |acc, byte| acc.wrapping_add(*byte),
            )
            .wrapping_neg()
    }
}

/// XOR of the address, the length and every message byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XorChecksum;

impl Checksum for XorChecksum {
    fn compute(&self, address: u8, length: u8, message: &[u8]) -> u8 {
        message.iter().fold(address ^ length, |acc, byte| acc ^ byte)
    }
}

/// Adapter for an arbitrary checksum closure.
pub struct ChecksumFn<F>(pub F);

impl<F> Checksum for ChecksumFn<F>
where
    F: Fn(u8, u8, &[u8]) -> u8 + Send + Sync,
{
    fn compute(&self, address: u8, length: u8, message: &[u8]) -> u8 {
        (self.0)(address, length, message)
    }
}

impl<F> fmt::Debug for ChecksumFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChecksumFn").field(&"<fn>").finish()
    }
}
