use futures_util::{SinkExt, StreamExt};
use helvar_protocol::{FrameType, command, framed::MessageCodec};
use helvar_router::server::Config;
use helvar_tests::spawn_router;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

#[tokio::test]
async fn query_router_over_async_stream() {
    let addr = spawn_router(Config::default());
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut framed = Framed::new(stream, MessageCodec::default());

    framed.send(command::query_clusters()).await.unwrap();
    let reply = framed.next().await.unwrap().unwrap();
    assert_eq!(reply.frame_type, FrameType::Reply);
    assert_eq!(reply.answer, "1,2");

    framed
        .send(&command::query_group_description(12))
        .await
        .unwrap();
    let reply = framed.next().await.unwrap().unwrap();
    assert_eq!(reply.answer, "Kitchen");
}

#[tokio::test]
async fn partial_replies_are_reassembled() {
    let addr = spawn_router(Config {
        max_answer_len: 2,
        ..Config::default()
    });
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut framed = Framed::new(stream, MessageCodec::default());

    framed.send(command::query_groups()).await.unwrap();
    let reply = framed.next().await.unwrap().unwrap();
    assert!(reply.is_partial);
    assert_eq!(reply.answer_integers().unwrap(), vec![1, 2, 3, 4, 10, 11, 12, 13]);

    // Control commands are not answered, the next reply belongs to the query
    framed
        .send(command::direct_level(command::Destination::Group(1), 10, &[]))
        .await
        .unwrap();
    framed.send(command::query_group(3)).await.unwrap();
    let reply = framed.next().await.unwrap().unwrap();
    assert_eq!(reply.answer, "@1.2.1.1");
}
