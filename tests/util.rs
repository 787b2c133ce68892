//! Shared test utilities for integration tests
//!
//! Builds synthetic "game binaries": known strings encoded as Shift-JIS and
//! embedded between runs of filler bytes that no dialect accepts.

#![allow(dead_code)]

use assert_fs::prelude::*;
use sjismine::core::codec::Dialect;

/// Filler between embedded strings
pub const GAP: [u8; 4] = [0x00, 0x01, 0x00, 0xFF];

/// Encode each text and join them with [`GAP`] filler.
pub fn encode_binary(texts: &[&str]) -> Vec<u8>
{
    let mut out = GAP.to_vec();
    for text in texts
    {
        let bytes = Dialect::ShiftJis
            .encode(text)
            .expect("test text must be encodable");
        out.extend_from_slice(&bytes);
        out.extend_from_slice(&GAP);
    }
    out
}

/// Strings the default heuristics keep
pub const KEEPERS: [&str; 3] = ["こんにちは", "ありがとう", "カタカナです"];

/// A temp directory holding `game.bin` with keepers, junk and a duplicate.
pub fn make_game_fixture() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    let mut texts: Vec<&str> = KEEPERS.to_vec();
    // too short, low variety, duplicate
    texts.extend(["あい", "ああああああ", "こんにちは"]);

    tmp.child("game.bin")
        .write_binary(&encode_binary(&texts))
        .expect("write game.bin");

    tmp
}
