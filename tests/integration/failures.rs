//! Failure behavior: unknown names, unreachable nodes, missing parts.
//!
//! The non-atomic SEND and the stranded catalog entries below are the
//! documented contract, not bugs. The tests assert the behavior as-is.

use crate::*;

/// Receiving a name that was never sent reports not-found without
/// contacting any storage node: every node here is down, so any contact
/// attempt would surface as an error instead of a clean `None`.
#[tokio::test]
async fn receive_unknown_name_contacts_no_node() {
    let cluster = Cluster::start_with([false; PART_COUNT]).await.unwrap();
    let result = cluster.receive_bytes("never-sent.txt").await.unwrap();
    assert!(result.is_none());
}

/// SEND with one node down: the other two parts land, the third is
/// absent, and the catalog still lists the file.
#[tokio::test]
async fn send_with_node_down_is_not_rolled_back() {
    let cluster = Cluster::start_with([true, true, false]).await.unwrap();
    cluster.send_bytes("degraded.txt", b"0123456789").await.unwrap();

    // Parts go out in index order; once part 2 exists, part 3's attempt
    // has already failed or is about to. Give the failed dial a moment.
    assert!(
        eventually(|| async { cluster.node_part_path("degraded.txt", 1).exists() }).await,
        "part 2 never landed"
    );
    assert_eq!(
        std::fs::read(cluster.node_part_path("degraded.txt", 0)).unwrap(),
        b"012"
    );
    assert_eq!(
        std::fs::read(cluster.node_part_path("degraded.txt", 1)).unwrap(),
        b"345"
    );
    assert!(
        !cluster.node_part_path("degraded.txt", 2).exists(),
        "part 3 should never reach a down node"
    );

    // The catalog entry stays despite the incomplete distribution.
    let names = cluster.client().list().await.unwrap();
    assert_eq!(names, vec!["degraded.txt".to_string()]);
}

/// A SEND cut off mid-payload fails the request without leaving the
/// inbound scratch blob behind in the coordinator's storage directory.
#[tokio::test]
async fn aborted_send_leaves_no_scratch_blob() {
    use tokio::io::AsyncWriteExt;
    use triad_core::wire::{self, Command};

    let cluster = Cluster::start().await.unwrap();

    // Promise 100 bytes, deliver 10, hang up.
    let mut stream = tokio::net::TcpStream::connect(&cluster.coordinator_addr)
        .await
        .unwrap();
    wire::write_command(&mut stream, Command::Send).await.unwrap();
    wire::write_string(&mut stream, "cutoff.bin").await.unwrap();
    wire::write_size(&mut stream, 100).await.unwrap();
    stream.write_all(b"0123456789").await.unwrap();
    stream.shutdown().await.unwrap();
    drop(stream);

    // The catalog entry appears before buffering, so once it is listed
    // the handler has run; the scratch blob must not survive the abort.
    assert!(
        eventually(|| async {
            let listed = cluster
                .client()
                .list()
                .await
                .is_ok_and(|names| names.contains(&"cutoff.bin".to_string()));
            listed && !cluster.coordinator_dir.join("tmp_cutoff.bin").exists()
        })
        .await,
        "aborted send left tmp_cutoff.bin in the coordinator dir"
    );
}

/// RECEIVE with a part missing on its node fails the whole operation and
/// leaves the catalog entry in place. No partial delivery.
#[tokio::test]
async fn receive_with_missing_part_fails_whole_operation() {
    let cluster = Cluster::start().await.unwrap();
    cluster.send_bytes("gapped.bin", b"0123456789").await.unwrap();
    assert!(
        eventually(|| async { cluster.node_part_path("gapped.bin", 2).exists() }).await,
        "distribution never completed"
    );

    // Remove the middle part behind the coordinator's back.
    std::fs::remove_file(cluster.node_part_path("gapped.bin", 1)).unwrap();

    let err = cluster.receive_bytes("gapped.bin").await;
    assert!(err.is_err(), "receive should fail on a missing part");

    // The entry is stranded, not repaired and not removed.
    let names = cluster.client().list().await.unwrap();
    assert_eq!(names, vec!["gapped.bin".to_string()]);
}

/// RECEIVE with a node unreachable fails the same way.
#[tokio::test]
async fn receive_with_node_down_fails_whole_operation() {
    let cluster = Cluster::start_with([true, true, false]).await.unwrap();
    cluster.send_bytes("half.bin", b"0123456789").await.unwrap();
    assert!(
        eventually(|| async { cluster.node_part_path("half.bin", 1).exists() }).await,
        "distribution to live nodes never completed"
    );

    let err = cluster.receive_bytes("half.bin").await;
    assert!(err.is_err(), "receive should fail when a node is down");
    assert_eq!(
        cluster.client().list().await.unwrap(),
        vec!["half.bin".to_string()]
    );
}
