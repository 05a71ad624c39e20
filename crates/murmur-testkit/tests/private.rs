//! Private messages over learned next hops.

use std::time::Duration;

use murmur_testkit::{node_addr, wait_until, TestCluster, Topology};

const SETTLE: Duration = Duration::from_secs(5);

async fn routed_line() -> TestCluster {
    let cluster = TestCluster::start(&["a", "b", "c"], Topology::Line, |c| {
        c.gossip.route_rumor_interval = Some(Duration::from_millis(100));
    })
    .await;
    let (a, c) = (cluster.node(0), cluster.node(2));
    assert!(wait_until(SETTLE, || a.route_to("c").is_some() && c.route_to("a").is_some()).await);
    cluster
}

#[tokio::test]
async fn test_private_message_crosses_two_hops() {
    let cluster = routed_line().await;
    let (a, c) = (cluster.node(0), cluster.node(2));
    assert_eq!(a.route_to("c"), Some(node_addr(1)));

    let sent = a.send_private("c", "secret");
    assert_eq!(sent.origin, "a");
    assert_eq!(sent.id, 0);
    assert_eq!(a.private_messages(), vec![sent]);

    assert!(wait_until(SETTLE, || c.private_messages().len() == 1).await);
    let received = &c.private_messages()[0];
    assert_eq!(received.text, "secret");
    assert_eq!(received.origin, "a");
    // Decremented once by a and once by b.
    assert_eq!(received.hop_limit, 8);

    // The relay keeps nothing.
    assert!(cluster.node(1).private_messages().is_empty());
}

#[tokio::test]
async fn test_private_message_dies_at_hop_limit() {
    let cluster = routed_line().await;
    let (a, c) = (cluster.node(0), cluster.node(2));

    a.gossip().send_private("c", "too far", Some(2));
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(c.private_messages().is_empty());

    a.gossip().send_private("c", "just enough", Some(3));
    assert!(wait_until(SETTLE, || c.private_messages().len() == 1).await);
    assert_eq!(c.private_messages()[0].hop_limit, 1);
}

#[tokio::test]
async fn test_private_message_without_route_is_kept_locally() {
    let cluster = TestCluster::start(&["a", "b"], Topology::Line, |_| {}).await;
    let a = cluster.node(0);

    let sent = a.send_private("nobody", "hello?");
    assert_eq!(a.private_messages(), vec![sent]);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(cluster.node(1).private_messages().is_empty());
}
