//! Whole-board scenarios: matching across nodes, blasts, falls and refills.

use nodeblast::grid::Grid;
use nodeblast::matching::find_matches;
use nodeblast::node::{Node, NodeId, NodeTemplate};
use nodeblast::spawner::{SpawnEntry, SpawnMode, Spawner};
use nodeblast::{Board, BoardEvent, Coord, Phase, Timings, TileType};
use std::collections::BTreeMap;

fn spawner() -> Spawner {
    let entry = SpawnEntry {
        template: NodeTemplate::parse("BGOP").unwrap(),
        weight: 1,
    };
    Spawner::new(vec![entry], 5).unwrap()
}

fn solid(t: TileType) -> NodeTemplate {
    NodeTemplate::solid(t)
}

/// 3x3 board of solid red nodes with a green one at (x, y).
fn red_board_with_green(timings: Timings, green: Coord) -> Board {
    let mut board = Board::new(Grid::new(3, 3), spawner(), timings);
    for y in 0..3 {
        for x in 0..3 {
            let coord = Coord::new(x, y);
            let t = if coord == green {
                TileType::Green
            } else {
                TileType::Red
            };
            let node = board.create_node(&solid(t));
            board.place_node(coord, node);
        }
    }
    board
}

#[test]
fn test_find_matches_spans_eight_red_nodes() {
    // Board state right after swapping (0,0) with (1,1): green in the corner.
    let mut grid = Grid::new(3, 3);
    let mut nodes = BTreeMap::new();
    let mut id = 0;
    for y in 0..3 {
        for x in 0..3 {
            let coord = Coord::new(x, y);
            let t = if coord == Coord::new(0, 0) {
                TileType::Green
            } else {
                TileType::Red
            };
            let mut node = Node::from_template(NodeId(id), &solid(t));
            node.cell = Some(coord);
            grid.cell_mut(coord).node = Some(node.id);
            nodes.insert(node.id, node);
            id += 1;
        }
    }
    let centre = grid.node_at(Coord::new(1, 1)).unwrap();
    let group = find_matches(&grid, &nodes, centre, TileType::Red);
    assert_eq!(group.nodes.len(), 8);
    assert_eq!(group.tile_count(), 8);
    assert!(group.qualifies());
    assert!(!group.nodes.contains(&NodeId(0)));

    let corner = find_matches(&grid, &nodes, NodeId(0), TileType::Green);
    assert_eq!(corner.tile_count(), 1);
    assert!(!corner.qualifies());
}

#[test]
fn test_swap_into_centre_blasts_eight() {
    let mut board = red_board_with_green(Timings::instant(), Coord::new(1, 1));
    let green = board.grid().node_at(Coord::new(1, 1)).unwrap();
    board.swap(Coord::new(0, 0), Coord::new(1, 1)).unwrap();
    assert!(board.settle(500));

    let events: Vec<_> = board.drain_events().collect();
    assert!(events.contains(&BoardEvent::Blast { tiles: 8 }));
    let destroyed = events
        .iter()
        .filter(|e| matches!(e, BoardEvent::NodeDestroyed { .. }))
        .count();
    assert_eq!(destroyed, 8);
    assert_eq!(events.last(), Some(&BoardEvent::Settled));

    // The green survivor dropped to the bottom of its column.
    assert_eq!(
        board.node(green).and_then(|n| n.cell),
        Some(Coord::new(0, 2))
    );
    assert!(board.grid().cells().all(|c| c.is_occupied()));
    assert_eq!(board.phase(), Phase::Idle);
}

#[test]
fn test_two_tile_region_never_blasts() {
    let mut board = Board::new(Grid::new(2, 2), spawner(), Timings::instant());
    for (x, y, t) in [
        (0, 0, TileType::Red),
        (1, 0, TileType::Yellow),
        (0, 1, TileType::Purple),
        (1, 1, TileType::Red),
    ] {
        let node = board.create_node(&solid(t));
        board.place_node(Coord::new(x, y), node);
    }
    board.swap(Coord::new(1, 0), Coord::new(1, 1)).unwrap();
    assert!(board.settle(100));
    let events: Vec<_> = board.drain_events().collect();
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, BoardEvent::Blast { .. } | BoardEvent::TileBlast { .. }))
    );
    assert_eq!(board.nodes().count(), 4);
}

#[test]
fn test_fall_keeps_nodes_and_fill_closes_gaps() {
    let grid = Grid::from_types(2, 3, |c| {
        if c == Coord::new(0, 1) {
            nodeblast::grid::CellType::Empty
        } else {
            nodeblast::grid::CellType::Normal
        }
    });
    let mut board = Board::new(grid, spawner(), Timings::default());
    let template = NodeTemplate::parse("RYUR").unwrap();
    let a = board.create_node(&template);
    let a_tiles = a.tile_count();
    let a = board.place_node(Coord::new(0, 0), a);
    let b = board.create_node(&template);
    let b = board.place_node(Coord::new(1, 1), b);

    board.start();
    assert!(board.settle(2000));

    assert_eq!(board.node(a).and_then(|n| n.cell), Some(Coord::new(0, 2)));
    assert_eq!(board.node(b).and_then(|n| n.cell), Some(Coord::new(1, 2)));
    assert_eq!(board.node(a).map(Node::tile_count), Some(a_tiles));
    for cell in board.grid().cells() {
        assert_eq!(cell.is_occupied(), cell.is_normal(), "{}", cell.coord);
    }
    // Five normal cells: two placed nodes and three spawns.
    assert_eq!(board.nodes().count(), 5);
    assert!(board.nodes().all(|n| !n.is_falling()));
}

#[test]
fn test_teardown_stops_the_pipeline() {
    let mut board = red_board_with_green(Timings::default(), Coord::new(1, 1));
    board.swap(Coord::new(0, 0), Coord::new(1, 1)).unwrap();
    for _ in 0..Timings::default().swap_ticks + 3 {
        board.tick();
    }
    assert!(board.is_busy());
    board.teardown();
    assert_eq!(board.phase(), Phase::Cancelled);
    let before = board.nodes().count();
    for _ in 0..50 {
        board.tick();
    }
    assert_eq!(board.nodes().count(), before);
    assert!(board.nodes().all(|n| !n.is_falling() && !n.is_empty()));
}

#[test]
fn test_spawner_is_deterministic_per_seed() {
    let entries = vec![
        SpawnEntry {
            template: solid(TileType::Red),
            weight: 3,
        },
        SpawnEntry {
            template: solid(TileType::Blue),
            weight: 1,
        },
        SpawnEntry {
            template: NodeTemplate::parse("RRGG").unwrap(),
            weight: 2,
        },
    ];
    let mut a = Spawner::new(entries.clone(), 42).unwrap();
    let mut b = Spawner::new(entries, 42).unwrap();
    assert_eq!(a.mode(), SpawnMode::Sequential);
    assert_eq!(a.next_template(), solid(TileType::Red));
    assert_eq!(a.next_template(), solid(TileType::Blue));
    assert_eq!(a.next_template(), NodeTemplate::parse("RRGG").unwrap());
    for _ in 0..3 {
        b.next_template();
    }
    for _ in 0..30 {
        assert_eq!(a.next_template(), b.next_template());
    }
    assert_eq!(a.mode(), SpawnMode::WeightedRandom);
}
