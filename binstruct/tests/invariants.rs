//! Property tests for invariants that should hold across the whole integer/bytes/list input
//! space, rather than just the hand-picked scenario fixtures.

use proptest::prelude::*;

use binstruct::{parse_struct_traced, CompileTarget, Data, ParseOptions};
use binstruct_compiler::{FieldSpec, LenSpec, StructureDescription};
use binstruct_format::Value;

proptest! {
    /// A description with no `Seek`/`Peek` advances the cursor by exactly the number of bytes its
    /// primitive reads consumed.
    #[test]
    fn cursor_advances_by_bytes_consumed(a in any::<u32>(), b in 0u8..=20, data in proptest::collection::vec(any::<u8>(), 0..20)) {
        let data = &data[..data.len().min(b as usize)];
        let description: StructureDescription = vec![
            ("a".to_string(), FieldSpec::uint(32)),
            ("len".to_string(), FieldSpec::uint(8)),
            ("payload".to_string(), FieldSpec::bytes(LenSpec::var("len"))),
        ];
        let mut bytes = a.to_le_bytes().to_vec();
        bytes.push(data.len() as u8);
        bytes.extend_from_slice(data);

        let outcome = parse_struct_traced(
            CompileTarget::Description(description),
            Data::Slice(&bytes),
            ParseOptions::default(),
        )
        .unwrap();

        let last = outcome.trace.last().unwrap();
        prop_assert_eq!(last.offset_after as usize, bytes.len());
    }

    /// `Peek[X]` leaves the cursor exactly where it found it, and its captured value matches what
    /// reading `X` directly (without the peek) would have produced at the same position.
    #[test]
    fn peek_does_not_move_cursor(byte in any::<u8>(), trailing in any::<u8>()) {
        let peeked_description: StructureDescription = vec![
            ("p".to_string(), FieldSpec::Peek(Box::new(FieldSpec::uint(8)))),
            ("rest".to_string(), FieldSpec::uint(8)),
        ];
        let plain_description: StructureDescription = vec![
            ("p".to_string(), FieldSpec::uint(8)),
        ];

        let data = [byte, trailing];
        let peeked = parse_struct_traced(
            CompileTarget::Description(peeked_description),
            Data::Slice(&data),
            ParseOptions::default(),
        )
        .unwrap();
        let plain = parse_struct_traced(
            CompileTarget::Description(plain_description),
            Data::Slice(&data),
            ParseOptions::default(),
        )
        .unwrap();

        prop_assert_eq!(peeked.record.get("p"), plain.record.get("p"));
        let peek_snapshot = &peeked.trace[0];
        prop_assert_eq!(peek_snapshot.offset_before, peek_snapshot.offset_after);
    }

    /// `List[n, UInt8]` always produces an output of length exactly `n`.
    #[test]
    fn list_output_length_matches_count(count in 0u8..=16) {
        let data = vec![0u8; count as usize];
        let description: StructureDescription = vec![(
            "items".to_string(),
            FieldSpec::List {
                count: LenSpec::Literal(count as i64),
                element: Box::new(FieldSpec::uint(8)),
            },
        )];
        let record = binstruct::parse_struct(
            CompileTarget::Description(description),
            Data::Slice(&data),
            ParseOptions::default(),
        )
        .unwrap();
        match record.get("items") {
            Some(Value::List(items)) => prop_assert_eq!(items.len(), count as usize),
            other => prop_assert!(false, "expected a list, got {other:?}"),
        }
    }

    /// Consecutive `Pos` fields with no read between them return equal values.
    #[test]
    fn consecutive_pos_fields_are_equal(padding in any::<u8>()) {
        let description: StructureDescription = vec![
            ("before".to_string(), FieldSpec::Pos),
            ("after".to_string(), FieldSpec::Pos),
        ];
        let record = binstruct::parse_struct(
            CompileTarget::Description(description),
            Data::Slice(&[padding]),
            ParseOptions::default(),
        )
        .unwrap();
        prop_assert_eq!(record.get("before"), record.get("after"));
    }

    /// Two independent parses of the same compiled program against different inputs never see
    /// each other's state: the second parse's result depends only on its own input.
    #[test]
    fn independent_parses_do_not_leak_state(first in any::<u8>(), second in any::<u8>()) {
        let description: StructureDescription = vec![("v".to_string(), FieldSpec::uint(8))];
        let program = binstruct::compile_struct(CompileTarget::Description(description)).unwrap();

        let _ = binstruct::parse_struct(
            CompileTarget::Compiled(program.clone()),
            Data::Slice(&[first]),
            ParseOptions::default(),
        )
        .unwrap();
        let record = binstruct::parse_struct(
            CompileTarget::Compiled(program),
            Data::Slice(&[second]),
            ParseOptions::default(),
        )
        .unwrap();

        prop_assert_eq!(record.get("v"), Some(&Value::UInt(second as u64)));
    }
}
