//! Run with `cargo test --all-features`.

use quibs::internal::{call_count, evaluated_paths, reset};
use quibs::{CacheMode, CacheStatus, Graph, Value, args, array, path};

#[test]
fn test_unaffected_nodes_are_not_recomputed() {
    let mut graph = Graph::default();
    let a = graph.input(array![1, 2, 3]);
    let b = graph.apply("negative", args![a]).unwrap();
    let first = graph.apply("getitem", args![b, 0]).unwrap();
    let total = graph.apply("sum", args![b]).unwrap();
    assert_eq!(graph.value(first).unwrap(), Value::Int(-1));
    assert_eq!(graph.value(total).unwrap(), Value::Int(-6));

    reset();
    graph.invalidate(a, &path![2]).unwrap();
    assert_eq!(graph.cache_status(first).unwrap(), CacheStatus::AllValid);
    assert_eq!(graph.value(first).unwrap(), Value::Int(-1));
    assert_eq!(call_count(first), 0);
    assert_eq!(call_count(b), 0);

    assert_eq!(graph.value(total).unwrap(), Value::Int(-6));
    assert_eq!(call_count(total), 1);
    assert_eq!(call_count(b), 1);
    assert_eq!(call_count(a), 1);
}

#[test]
fn test_only_invalid_parts_are_computed() {
    let mut graph = Graph::default();
    let a = graph.input(array![1, 2, 3]);
    let b = graph.apply("negative", args![a]).unwrap();
    graph.value(b).unwrap();

    reset();
    graph.invalidate(a, &path![1]).unwrap();
    assert_eq!(graph.cache_status(b).unwrap(), CacheStatus::Partial);
    assert_eq!(graph.value_at(b, &path![0]).unwrap(), Value::Int(-1));
    assert_eq!(call_count(b), 0);

    assert_eq!(graph.value_at(b, &path![1]).unwrap(), Value::Int(-2));
    assert_eq!(evaluated_paths(b), vec![path![1]]);
    assert_eq!(graph.cache_status(b).unwrap(), CacheStatus::AllValid);
}

#[test]
fn test_cache_off_recomputes() {
    let mut graph = Graph::default();
    let a = graph.input(array![1, 2, 3]);
    let b = graph.apply("square", args![a]).unwrap();
    graph.set_cache_mode(b, CacheMode::Off).unwrap();

    reset();
    graph.value(b).unwrap();
    graph.value(b).unwrap();
    assert_eq!(call_count(b), 2);
    assert_eq!(call_count(a), 1);
    assert_eq!(graph.cache_status(b).unwrap(), CacheStatus::AllInvalid);
}

#[test]
fn test_overrides_stop_invalidation() {
    let mut graph = Graph::default();
    let a = graph.input(array![1, 2, 3]);
    let b = graph.apply("add", args![a, 1]).unwrap();
    graph.assign(a, path![0], 10).unwrap();
    assert_eq!(graph.value(b).unwrap(), Value::from(array![11, 3, 4]));

    reset();
    graph.invalidate(a, &path![0]).unwrap();
    assert_eq!(graph.cache_status(b).unwrap(), CacheStatus::AllValid);
    assert_eq!(graph.value(b).unwrap(), Value::from(array![11, 3, 4]));
    assert_eq!(call_count(b), 0);
}

#[test]
fn test_override_recomputes_children_only() {
    let mut graph = Graph::default();
    let a = graph.input(array![1, 2, 3]);
    let b = graph.apply("add", args![a, 1]).unwrap();
    graph.value(b).unwrap();

    reset();
    graph.assign(a, path![2], 7).unwrap();
    assert_eq!(graph.value(b).unwrap(), Value::from(array![2, 3, 8]));
    assert_eq!(call_count(a), 0);
    assert_eq!(call_count(b), 1);
}

#[test]
fn test_parameter_change_recomputes_everything() {
    let mut graph = Graph::default();
    let a = graph.input(array![[1, 2], [3, 4]]);
    let axis = graph.input(0);
    let s = graph.apply("sum", args![a, axis]).unwrap();
    graph.value(s).unwrap();

    reset();
    graph.assign(axis, path![], 1).unwrap();
    assert_eq!(graph.value(s).unwrap(), Value::from(array![3, 7]));
    assert_eq!(evaluated_paths(s), vec![path![]]);
}
