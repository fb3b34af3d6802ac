//! Send / list / receive round-trips.

use crate::*;

/// The canonical 10-byte scenario: 10 / 3 = 3 with remainder 1, so the
/// parts are "012", "345", and "6789", and receive reassembles exactly.
#[tokio::test]
async fn send_list_receive_round_trip() {
    let cluster = Cluster::start().await.unwrap();
    cluster.send_bytes("digits.txt", b"0123456789").await.unwrap();

    // Distribution completes after the client's SEND returns.
    assert!(
        eventually(|| async {
            cluster.node_part_path("digits.txt", 2).exists()
        })
        .await,
        "part 3 never landed on node 3"
    );

    let expected: [&[u8]; PART_COUNT] = [b"012", b"345", b"6789"];
    for (index, want) in expected.iter().enumerate() {
        let got = std::fs::read(cluster.node_part_path("digits.txt", index)).unwrap();
        assert_eq!(&got, want, "part {} content mismatch", index + 1);
    }

    let names = cluster.client().list().await.unwrap();
    assert_eq!(names, vec!["digits.txt".to_string()]);

    let (served, bytes) = cluster.receive_bytes("digits.txt").await.unwrap().unwrap();
    assert_eq!(served, "digits.txt");
    assert_eq!(bytes, b"0123456789");
}

/// A successful receive consumes the file: the catalog entry goes away
/// and the parts are deleted from the nodes.
#[tokio::test]
async fn receive_consumes_the_file() {
    let cluster = Cluster::start().await.unwrap();
    cluster.send_bytes("once.bin", b"only one fetch").await.unwrap();
    assert!(
        eventually(|| async { cluster.node_part_path("once.bin", 2).exists() }).await,
        "distribution never completed"
    );

    let (_, bytes) = cluster.receive_bytes("once.bin").await.unwrap().unwrap();
    assert_eq!(bytes, b"only one fetch");

    // Catalog removal and node cleanup happen after the payload has been
    // streamed to us.
    assert!(
        eventually(|| async { cluster.client().list().await.unwrap().is_empty() }).await,
        "catalog entry survived a successful receive"
    );
    assert!(
        eventually(|| async {
            (0..PART_COUNT).all(|i| !cluster.node_part_path("once.bin", i).exists())
        })
        .await,
        "parts survived a successful receive"
    );

    assert!(cluster.receive_bytes("once.bin").await.unwrap().is_none());
}

/// Sending the same name twice leaves one catalog entry and serves the
/// latest content.
#[tokio::test]
async fn resend_lists_once_and_serves_latest_content() {
    let cluster = Cluster::start().await.unwrap();
    cluster.send_bytes("doc.txt", b"first contents").await.unwrap();
    cluster.send_bytes("doc.txt", b"second contents!").await.unwrap();

    let names = cluster.client().list().await.unwrap();
    assert_eq!(names, vec!["doc.txt".to_string()]);

    // Wait for the second distribution to land before fetching. Parts go
    // out in index order, so the last part is the one to watch.
    assert!(
        eventually(|| async {
            std::fs::read(cluster.node_part_path("doc.txt", 2))
                .map(|b| b == b"tents!")
                .unwrap_or(false)
        })
        .await
    );

    let (_, bytes) = cluster.receive_bytes("doc.txt").await.unwrap().unwrap();
    assert_eq!(bytes, b"second contents!");
}

/// Files shorter than three bytes produce zero-length parts and still
/// round-trip byte for byte.
#[tokio::test]
async fn tiny_files_round_trip() {
    for data in [&b""[..], b"a", b"ab", b"abc"] {
        let cluster = Cluster::start().await.unwrap();
        cluster.send_bytes("tiny", data).await.unwrap();
        assert!(
            eventually(|| async { cluster.node_part_path("tiny", 2).exists() }).await,
            "distribution of {} bytes never completed",
            data.len()
        );
        let (_, bytes) = cluster.receive_bytes("tiny").await.unwrap().unwrap();
        assert_eq!(bytes, data, "round trip failed for {} bytes", data.len());
    }
}

/// A payload larger than the copy buffer round-trips intact.
#[tokio::test]
async fn large_file_round_trip() {
    let data: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    let cluster = Cluster::start().await.unwrap();
    cluster.send_bytes("big.bin", &data).await.unwrap();
    assert!(
        eventually(|| async {
            std::fs::metadata(cluster.node_part_path("big.bin", 2))
                .map(|m| m.len() == 100_000)
                .unwrap_or(false)
        })
        .await,
        "distribution never completed"
    );

    let (_, bytes) = cluster.receive_bytes("big.bin").await.unwrap().unwrap();
    assert_eq!(bytes.len(), data.len());
    assert_eq!(bytes, data);
}
