use std::collections::HashSet;

use blockdoc_engine::editing::SequentialIds;
use blockdoc_engine::{BlockId, BlockList, BlockType, Cmd, DocumentBlock, TableSize};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add(usize, usize),
    Delete(usize),
    Move(usize, usize),
    ToTable(usize, usize, usize),
    AddRow(usize),
    AddColumn(usize),
    RemoveRow(usize),
    RemoveColumn(usize),
    Split(usize, usize),
    Merge(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<usize>(), 0..BlockType::ALL.len()).prop_map(|(i, t)| Op::Add(i, t)),
        any::<usize>().prop_map(Op::Delete),
        (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Move(a, b)),
        (any::<usize>(), 0..6usize, 0..6usize).prop_map(|(i, r, c)| Op::ToTable(i, r, c)),
        any::<usize>().prop_map(Op::AddRow),
        any::<usize>().prop_map(Op::AddColumn),
        any::<usize>().prop_map(Op::RemoveRow),
        any::<usize>().prop_map(Op::RemoveColumn),
        (any::<usize>(), 0..10usize).prop_map(|(i, at)| Op::Split(i, at)),
        any::<usize>().prop_map(Op::Merge),
    ]
}

/// Pick an existing id, or occasionally one that does not exist.
fn pick(list: &BlockList, index: usize) -> BlockId {
    let ids = list.ids();
    if index % 7 == 6 {
        return BlockId::new("missing");
    }
    ids[index % ids.len()].clone()
}

fn to_cmd(list: &BlockList, op: Op) -> Cmd {
    match op {
        Op::Add(i, t) => Cmd::AddBlock {
            after: pick(list, i),
            block_type: BlockType::ALL[t],
        },
        Op::Delete(i) => Cmd::DeleteBlock { id: pick(list, i) },
        Op::Move(a, b) => Cmd::MoveBlock {
            from: pick(list, a),
            to: pick(list, b),
        },
        Op::ToTable(i, rows, columns) => Cmd::ChangeBlockType {
            id: pick(list, i),
            to: BlockType::Table,
            table: Some(TableSize::new(rows, columns)),
        },
        Op::AddRow(i) => Cmd::AddTableRow { id: pick(list, i) },
        Op::AddColumn(i) => Cmd::AddTableColumn { id: pick(list, i) },
        Op::RemoveRow(i) => Cmd::RemoveTableRow { id: pick(list, i) },
        Op::RemoveColumn(i) => Cmd::RemoveTableColumn { id: pick(list, i) },
        Op::Split(i, at) => Cmd::SplitBlock { id: pick(list, i), at },
        Op::Merge(i) => Cmd::MergeWithPrevious { id: pick(list, i) },
    }
}

fn assert_invariants(blocks: &[DocumentBlock]) -> Result<(), TestCaseError> {
    prop_assert!(!blocks.is_empty());
    let ids: HashSet<_> = blocks.iter().map(|b| &b.id).collect();
    prop_assert_eq!(ids.len(), blocks.len());

    for table in blocks.iter().filter_map(DocumentBlock::table) {
        prop_assert!(table.is_rectangular());
        prop_assert!(table.row_count() >= 1 && table.column_count() >= 1);
        let cells: HashSet<_> = table
            .rows
            .iter()
            .flat_map(|r| r.cells.iter().map(|c| c.id.as_str()))
            .collect();
        prop_assert_eq!(cells.len(), table.row_count() * table.column_count());
    }
    Ok(())
}

fn seeded() -> BlockList {
    BlockList::from_blocks(
        vec![
            DocumentBlock::paragraph("p1", "first line"),
            DocumentBlock::paragraph("p2", "<b>bold</b> text"),
        ],
        Box::new(SequentialIds::new("n")),
    )
}

proptest! {
    #[test]
    fn test_sequence_invariants_hold(ops in prop::collection::vec(op(), 0..60)) {
        let mut list = seeded();
        for op in ops {
            let before = list.version();
            let cmd = to_cmd(&list, op);
            let patch = list.apply(cmd);
            prop_assert_eq!(list.version(), before + u64::from(patch.applied()));
            assert_invariants(&list.to_vec())?;
        }
    }

    #[test]
    fn test_serialization_round_trip(ops in prop::collection::vec(op(), 0..30)) {
        let mut list = seeded();
        for op in ops {
            let cmd = to_cmd(&list, op);
            list.apply(cmd);
        }

        let json = serde_json::to_string(&list.to_vec()).unwrap();
        let reloaded: Vec<DocumentBlock> = serde_json::from_str(&json).unwrap();
        let again = BlockList::from_blocks(reloaded, Box::new(SequentialIds::new("r")));
        prop_assert_eq!(serde_json::to_string(&again.to_vec()).unwrap(), json);
    }
}

#[test]
fn test_fresh_table_is_not_cumulative() {
    let mut list = seeded();
    let id = BlockId::new("p1");
    let to_table = || Cmd::ChangeBlockType {
        id: BlockId::new("p1"),
        to: BlockType::Table,
        table: Some(TableSize::new(3, 3)),
    };

    list.apply(to_table());
    list.apply(Cmd::AddTableRow { id: id.clone() });
    list.apply(to_table());

    let block = list.get(&id).unwrap();
    let table = block.table().unwrap();
    assert_eq!((table.row_count(), table.column_count()), (3, 3));
    assert!(
        table
            .rows
            .iter()
            .flat_map(|r| &r.cells)
            .all(|c| c.content.is_empty())
    );
}

#[test]
fn test_delete_until_one_block_remains() {
    let mut list = seeded();
    for _ in 0..5 {
        let first = list.ids()[0].clone();
        list.apply(Cmd::DeleteBlock { id: first });
    }
    assert_eq!(list.len(), 1);
}
