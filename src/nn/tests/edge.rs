use approx::assert_abs_diff_eq;

use crate::nn::{DELTA_HISTORY_LEN, Edge};

#[test]
fn test_new_edge_has_seeded_history() {
    let edge = Edge::new(3, 0.25);
    assert_eq!(edge.id(), 3);
    assert_eq!(edge.weight(), 0.25);
    assert_eq!(edge.pending(), 0.0);
    assert_eq!(edge.delta_history().len(), 1);
    assert_eq!(edge.last_delta(), 0.0);
}

#[test]
fn test_queue_then_commit() {
    let mut edge = Edge::new(0, 1.0);
    edge.queue(0.1);
    edge.queue(0.2);
    // 提交前权重不变
    assert_eq!(edge.weight(), 1.0);
    assert_abs_diff_eq!(edge.pending(), 0.3);

    let committed = edge.commit(1.0);
    assert_abs_diff_eq!(committed, 0.3);
    assert_abs_diff_eq!(edge.weight(), 1.3);
    assert_eq!(edge.pending(), 0.0);
    assert_abs_diff_eq!(edge.last_delta(), 0.3);
}

#[test]
fn test_history_is_bounded() {
    let mut edge = Edge::new(0, 0.0);
    for i in 1..=10 {
        edge.queue(i as f32);
        edge.commit(1.0);
    }
    assert_eq!(edge.delta_history().len(), DELTA_HISTORY_LEN);
    assert_eq!(edge.last_delta(), 10.0);
    assert_eq!(edge.delta_history().front(), Some(&7.0));
}

#[test]
fn test_reset_deltas() {
    let mut edge = Edge::new(0, 0.0);
    edge.queue(0.5);
    edge.commit(0.5);
    edge.queue(1.0);
    edge.reset_deltas();

    assert_eq!(edge.pending(), 0.0);
    assert_eq!(edge.delta_history().len(), 1);
    assert_eq!(edge.last_delta(), 0.0);
    assert_abs_diff_eq!(edge.weight(), 0.25);
}
