//! Property-based coverage for the parser and command-classification layer.
//!
//! `arb_*` strategy builders feed numbered `proptest! { #[test] ... }` blocks,
//! each documenting one parser invariant. Hand-written table tests cover
//! well-formed sequences; the parser's fan-in accepts arbitrary byte streams
//! too, which is the case this module reaches for `proptest` to cover.

use proptest::prelude::*;
use vterm_core::{Action, Parser};
use vterm_core::commands::commands_for;

fn arb_bytes() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..256)
}

fn arb_printable_ascii() -> impl Strategy<Value = String> {
    proptest::collection::vec(0x20u8..0x7f, 0..128)
        .prop_map(|bytes| bytes.into_iter().map(|b| b as char).collect())
}

fn arb_csi_final() -> impl Strategy<Value = u8> {
    // Final bytes for CSI sequences live in 0x40..=0x7e.
    0x40u8..=0x7e
}

proptest! {
    // === 1. The parser never panics on an arbitrary byte stream. ===
    //
    // Every byte is legal parser input; malformed sequences are tracked via
    // `malformed`/ignored, not rejected.
    #[test]
    fn feed_never_panics_on_arbitrary_bytes(bytes in arb_bytes()) {
        let mut parser = Parser::new();
        let _ = parser.feed(&bytes);
    }

    // === 2. Feeding one byte at a time produces the same actions as
    // feeding the whole chunk at once. ===
    //
    // The parser's state machine must not depend on chunk boundaries: UTF-8
    // and CSI/OSC/DCS sequences can span arbitrary reads.
    #[test]
    fn chunking_does_not_affect_output(bytes in arb_bytes()) {
        let mut whole = Parser::new();
        let whole_actions = whole.feed(&bytes);

        let mut piecewise = Parser::new();
        let mut piecewise_actions = Vec::new();
        for &b in &bytes {
            piecewise.advance_into(b, &mut piecewise_actions);
        }

        prop_assert_eq!(whole_actions, piecewise_actions);
    }

    // === 3. Printable ASCII round-trips through the parser as `Print`
    // actions carrying the same characters, in order. ===
    #[test]
    fn printable_ascii_round_trips(text in arb_printable_ascii()) {
        let mut parser = Parser::new();
        let actions = parser.feed(text.as_bytes());
        let printed: String = actions
            .into_iter()
            .filter_map(|a| match a {
                Action::Print(ch) => Some(ch),
                _ => None,
            })
            .collect();
        prop_assert_eq!(printed, text);
    }

    // === 4. `commands_for` never panics on arbitrary bytes, including
    // well-formed-looking but truncated CSI/OSC/DCS sequences. ===
    #[test]
    fn commands_for_never_panics(bytes in arb_bytes()) {
        let _ = commands_for(&bytes);
    }

    // === 5. Classifying the same byte stream twice is deterministic:
    // identical byte sequences always produce identical state. ===
    #[test]
    fn commands_for_is_deterministic(bytes in arb_bytes()) {
        prop_assert_eq!(commands_for(&bytes), commands_for(&bytes));
    }

    // === 6. A well-formed CSI sequence with a single numeric parameter
    // is never classified as malformed-by-marker. ===
    #[test]
    fn well_formed_csi_is_not_malformed(n in 0u32..9999, final_byte in arb_csi_final()) {
        let mut bytes = format!("\x1b[{n}").into_bytes();
        bytes.push(final_byte);
        let mut parser = Parser::new();
        let _ = parser.feed(&bytes);
        prop_assert!(!parser.is_malformed());
    }
}
