//! Cross-module round trips for the streaming substrate: build a shuffled
//! binary edgelist with [`Shuffler`], read it back with [`EdgeCursor`], and
//! check the [`DegreeSidecar`] it produced agrees with a from-scratch
//! computation over the same edges.

use partition_core::edgelist::{DegreeSidecar, EdgeCursor};
use partition_core::shuffler::Shuffler;
use partition_core::writer::{read_all, AssignmentRecord, AssignmentWriter};
use tempfile::tempdir;

#[test]
fn shuffled_edgelist_and_degree_sidecar_agree() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("g");

    let mut shuffler = Shuffler::with_worker_count(&base, 1, 11, 4);
    let raw_edges = [
        (10u64, 20u64),
        (20, 30),
        (30, 10),
        (10, 40),
        (40, 20),
        (20, 50),
    ];
    for &(from, to) in &raw_edges {
        shuffler.add_edge(from, to);
    }
    let output_path = shuffler.finalize().unwrap();

    let cursor = EdgeCursor::open(&output_path).unwrap();
    assert_eq!(cursor.len(), raw_edges.len());

    let edges: Vec<_> = cursor.edges().collect();
    let from_scratch = DegreeSidecar::compute(cursor.header().num_vertices as usize, &edges);

    let degree_path = {
        let mut p = base.as_os_str().to_owned();
        p.push(".degree");
        p
    };
    let from_disk =
        DegreeSidecar::load(&degree_path, cursor.header().num_vertices as usize).unwrap();

    assert_eq!(from_disk.degree, from_scratch.degree);
}

#[test]
fn assignment_writer_round_trips_through_the_full_run_shape() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("g");

    let mut shuffler = Shuffler::new(&base, 16, 5);
    shuffler.add_edge(0, 1);
    shuffler.add_edge(1, 2);
    shuffler.add_edge(2, 0);
    let output_path = shuffler.finalize().unwrap();
    let cursor = EdgeCursor::open(&output_path).unwrap();

    let assignment_path = dir.path().join("assignment.bin");
    let mut writer = AssignmentWriter::create(&assignment_path).unwrap();
    for (i, edge) in cursor.edges().enumerate() {
        writer.write_edge(edge.first, edge.second, i % 2).unwrap();
    }
    for v in 0..cursor.header().num_vertices {
        writer.write_vertex(v, (v as usize) % 2).unwrap();
    }
    writer.finish().unwrap();

    let records = read_all(&assignment_path).unwrap();
    let edge_records = records
        .iter()
        .filter(|r| matches!(r, AssignmentRecord::Edge { .. }))
        .count();
    let vertex_records = records
        .iter()
        .filter(|r| matches!(r, AssignmentRecord::Vertex { .. }))
        .count();
    assert_eq!(edge_records, cursor.len());
    assert_eq!(vertex_records, cursor.header().num_vertices as usize);
}
