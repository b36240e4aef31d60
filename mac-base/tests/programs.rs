use mac_base::{
    loader,
    opcode::{Listing, ListingItem, OPCode, OPCodeKind},
    program::Program,
    runner::{MacConfig, MacRunner, MacSignal},
    vm::{Fault, RegisterKind},
    Word,
};
use proptest::prelude::*;

fn encode(ops: &[OPCode]) -> Vec<Word> {
    let mut cells = Vec::new();
    for op in ops {
        cells.push(op.opcode().as_raw());
        match *op {
            OPCode::Psh(v) => cells.push(v),
            OPCode::Mov { src, dst } => cells.extend([src.to_register(), dst.to_register()]),
            OPCode::Set { reg, value } => cells.extend([reg.to_register(), value]),
            OPCode::Log(reg) | OPCode::Gld(reg) | OPCode::Gpt(reg) => cells.push(reg.to_register()),
            OPCode::If { reg, value, target } | OPCode::Ifn { reg, value, target } => {
                cells.extend([reg.to_register(), value, target])
            }
            _ => {}
        }
    }
    cells
}

proptest! {
    #[test]
    fn pushes_build_the_stack(values in proptest::collection::vec(any::<Word>(), 0..200)) {
        let ops: Vec<_> = values.iter().copied().map(OPCode::Psh).collect();
        let mut mac = MacRunner::new(encode(&ops).as_slice().into());

        prop_assert_eq!(mac.finish(|_| {}), Ok(MacSignal::EOF));
        prop_assert_eq!(mac.context.sp(), values.len() as Word - 1);
        prop_assert_eq!(mac.context.stack_values(), values.as_slice());
    }

    #[test]
    fn loader_round_trip(values in proptest::collection::vec(any::<Word>(), 0..300), sep in "[ \t\n]{1,3}") {
        let text = values.iter().map(Word::to_string).collect::<Vec<_>>().join(&sep);
        let program = loader::load(text.as_bytes()).unwrap();

        prop_assert_eq!(program.as_slice(), values.as_slice());
        let mut capacity = 4;
        while capacity < values.len() {
            capacity *= 2;
        }
        prop_assert_eq!(program.capacity(), capacity);
    }

    #[test]
    fn loader_stops_at_garbage(values in proptest::collection::vec(-1000..1000 as Word, 0..20), junk in "[a-z]{1,4}") {
        let text = format!("{} {junk} 1 2", values.iter().map(Word::to_string).collect::<Vec<_>>().join(" "));
        let mut echoed = Vec::new();

        let err = loader::load_with(text.as_bytes(), |w| echoed.push(w)).unwrap_err();
        prop_assert!(matches!(err, loader::LoadError::MalformedProgram(_)));
        prop_assert_eq!(echoed, values);
    }

    #[test]
    fn faults_do_not_touch_state(cells in proptest::collection::vec(-2..20 as Word, 0..40)) {
        let config = MacConfig { stack_size: 4, max_steps: Some(64) };
        let mut mac = MacRunner::with_config(cells.as_slice().into(), config);

        let mut before = mac.context.clone();
        loop {
            match mac.run() {
                Ok(MacSignal::Halt | MacSignal::EOF) => break,
                Ok(_) => before = mac.context.clone(),
                Err(e) => {
                    prop_assert_eq!(&mac.context, &before);
                    prop_assert_eq!(e.ip, mac.context.ip());
                    break;
                }
            }
        }
        prop_assert!(mac.is_stopped());
    }
}

#[test]
fn listing_matches_execution_order() {
    use RegisterKind::*;

    let ops = [
        OPCode::Set { reg: A, value: 2 },
        OPCode::Gld(A),
        OPCode::Gld(A),
        OPCode::Mul,
        OPCode::Gpt(B),
        OPCode::Log(B),
        OPCode::Ifn { reg: B, value: 4, target: 0 },
        OPCode::Nop,
        OPCode::Hlt,
    ];
    let program: Program = encode(&ops).as_slice().into();

    let listed: Vec<_> = Listing::new(&program)
        .map(|(_, item)| match item {
            ListingItem::Instr(op) => op,
            ListingItem::Word(w) => panic!("undecodable cell {w}"),
        })
        .collect();
    assert_eq!(listed, ops);

    let mut mac = MacRunner::new(program);
    let mut signals = Vec::new();
    assert_eq!(mac.finish(|s| signals.push(s)), Ok(MacSignal::Halt));
    assert!(signals.contains(&MacSignal::Output(4)));
    assert!(signals.iter().any(|s| matches!(s, MacSignal::Note(n) if n.to_string() == "2 * 2 = 4")));
    assert!(signals.iter().any(|s| matches!(s, MacSignal::Note(n) if n.to_string() == "Do Nothing")));
}

#[test]
fn every_opcode_has_a_distinct_name() {
    let mut names: Vec<_> = OPCodeKind::VARIANTS.iter().map(|k| k.name()).collect();
    names.sort_unstable();
    names.dedup();

    assert_eq!(names.len(), OPCodeKind::VARIANTS.len());
}

#[test]
fn division_by_zero_program() {
    let program = loader::load("1 10 1 0 5 0".as_bytes()).unwrap();
    let mut mac = MacRunner::new(program);

    let err = mac.finish(|_| {}).unwrap_err();
    assert_eq!(err.fault, Fault::DivisionByZero);
    assert_eq!(err.ip, 4);
    assert_eq!(mac.context.stack_values(), &[10, 0]);
}
