//! Translation tests over the whole operation catalog.

use nsnotify_protocol::{
    translate, translate_all, Event, EventType, FetchResponse, INodeType, MetadataType, OpBatch,
    OpBody, OpCode, Operation,
};
use nsnotify_testkit::prelude::*;
use proptest::prelude::*;
use std::collections::HashSet;

#[test]
fn full_script_produces_expected_sequence() {
    let ops = sequenced(1, full_mutation_script(1_000));
    let events: Vec<Event> = ops.iter().flat_map(translate).collect();
    assert_eq!(events.len(), FULL_SCRIPT_EVENT_COUNT);

    let types: Vec<EventType> = events.iter().map(Event::event_type).collect();
    use EventType::*;
    assert_eq!(
        types,
        vec![
            Rename, Rename, Create, Close, Append, Close, Metadata, Metadata, Append, Unlink,
            Close, Unlink, Create, Metadata, Metadata, Create, Metadata, Metadata, Metadata,
            Metadata,
        ]
    );

    match &events[2] {
        Event::Create(create) => {
            assert_eq!(create.path, "/file2");
            assert_eq!(create.inode_type, INodeType::File);
            assert_eq!(create.replication, 2);
            assert!(create.overwrite);
        }
        other => panic!("expected create, got {other:?}"),
    }

    match &events[5] {
        Event::Close(close) => assert_eq!(close.file_size, Some(2 * BLOCK_SIZE)),
        other => panic!("expected close, got {other:?}"),
    }

    match &events[10] {
        Event::Close(close) => {
            assert_eq!(close.path, "/file2");
            assert_eq!(close.file_size, None);
        }
        other => panic!("expected close, got {other:?}"),
    }

    match &events[15] {
        Event::Create(create) => {
            assert_eq!(create.inode_type, INodeType::Symlink);
            assert_eq!(create.symlink_target.as_deref(), Some("/dir"));
        }
        other => panic!("expected symlink create, got {other:?}"),
    }

    let metadata: Vec<MetadataType> = events
        .iter()
        .filter_map(|e| match e {
            Event::Metadata(m) => Some(m.metadata_type()),
            _ => None,
        })
        .collect();
    assert_eq!(
        metadata,
        vec![
            MetadataType::Times,
            MetadataType::Replication,
            MetadataType::Perms,
            MetadataType::Owner,
            MetadataType::Xattrs,
            MetadataType::Xattrs,
            MetadataType::Acls,
            MetadataType::Acls,
        ]
    );
}

#[test]
fn every_kind_translates() {
    for code in OpCode::ALL {
        let op = Operation::new(1, sample_body(code));
        assert_eq!(op.op_code(), code);
        let events = translate(&op);
        assert!(events.len() <= 3, "{code:?} produced {} events", events.len());
    }
}

#[test]
fn sample_bodies_cover_every_code() {
    let kinds: HashSet<OpCode> = (0..=u8::MAX)
        .filter_map(OpCode::from_code)
        .map(|code| {
            let body = sample_body(code);
            assert_eq!(body.op_code(), code);
            body.op_code()
        })
        .collect();
    assert_eq!(kinds.len(), OpCode::COUNT);
}

#[test]
fn batches_survive_the_wire() {
    let ops = sequenced(100, full_mutation_script(5));
    let response = FetchResponse::Batch(OpBatch::new(ops.clone(), 117));
    let decoded = FetchResponse::decode(&response.encode().unwrap()).unwrap();

    let FetchResponse::Batch(batch) = decoded else {
        panic!("expected batch");
    };
    batch.validate().unwrap();
    assert_eq!(translate_all(&batch.operations), translate_all(&ops));
}

proptest! {
    #[test]
    fn translation_is_deterministic(ops in operation_run_strategy(32)) {
        let first = translate_all(&ops);
        let second = translate_all(&ops);
        prop_assert_eq!(first.len(), ops.len());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn batches_keep_source_sequence(ops in operation_run_strategy(32)) {
        for (batch, op) in translate_all(&ops).iter().zip(&ops) {
            prop_assert_eq!(batch.seq, op.seq);
        }
    }

    #[test]
    fn concat_shape(body in op_body_strategy()) {
        if let OpBody::ConcatDelete { target, sources, .. } = &body {
            let events = translate(&Operation::new(1, body.clone()));
            prop_assert_eq!(events.len(), sources.len() + 2);
            prop_assert_eq!(events[0].event_type(), EventType::Append);
            prop_assert_eq!(events[0].path(), target.as_str());
            for (event, source) in events[1..=sources.len()].iter().zip(sources) {
                prop_assert_eq!(event.event_type(), EventType::Unlink);
                prop_assert_eq!(event.path(), source.as_str());
            }
            let last = events.last().unwrap();
            prop_assert_eq!(last.event_type(), EventType::Close);
            prop_assert_eq!(last.path(), target.as_str());
        }
    }

    #[test]
    fn wire_roundtrip_preserves_translation(ops in operation_run_strategy(16)) {
        let last = ops.last().map(|op| op.seq).unwrap_or(0);
        let response = FetchResponse::Batch(OpBatch::new(ops.clone(), last));
        let decoded = FetchResponse::decode(&response.encode().unwrap()).unwrap();
        prop_assert_eq!(decoded, response);
    }
}
