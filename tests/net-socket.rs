use std::future::{ready, Ready};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use dnssock::net::config::Config;
use dnssock::net::counters::SocketCounters;
use dnssock::net::endpoint::{Endpoint, Protocol};
use dnssock::net::error::Error;
use dnssock::net::protocol::AsyncOpen;
use dnssock::net::socket::{new_socket, AsyncSocket, Received};
use dnssock::net::tcp::TcpSocket;
use dnssock::net::udp::UdpSocket;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

//------------ Helpers -------------------------------------------------------

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn udp_loopback() -> Endpoint {
    Endpoint::udp(SocketAddr::from(([127, 0, 0, 1], 0)))
}

async fn send(
    sock: &impl AsyncSocket,
    data: Vec<u8>,
    dest: &Endpoint,
) -> Result<usize, Error> {
    let (tx, rx) = oneshot::channel();
    sock.async_send(
        Bytes::from(data),
        dest,
        Box::new(move |res, _| {
            let _ = tx.send(res);
        }),
    )?;
    rx.await.unwrap()
}

async fn receive(
    sock: &impl AsyncSocket,
    capacity: usize,
) -> (Result<Received, Error>, BytesMut) {
    let (tx, rx) = oneshot::channel();
    sock.async_receive(
        BytesMut::with_capacity(capacity),
        capacity,
        Box::new(move |res, buf| {
            let _ = tx.send((res, buf));
        }),
    )
    .unwrap();
    rx.await.unwrap()
}

/// Hands out a prepared stream on the first open.
struct StreamOpen<S>(Mutex<Option<S>>);

impl<S> StreamOpen<S> {
    fn new(stream: S) -> Self {
        StreamOpen(Mutex::new(Some(stream)))
    }
}

impl<S: Send> AsyncOpen for StreamOpen<S> {
    type Handle = S;
    type Fut = Ready<Result<S, Error>>;

    fn open(&self, _: &Endpoint, _: &Config) -> Self::Fut {
        ready(self.0.lock().unwrap().take().ok_or_else(|| {
            Error::Transport(Arc::new(io::ErrorKind::ConnectionRefused.into()))
        }))
    }
}

async fn tcp_over<S>(stream: S) -> TcpSocket<StreamOpen<S>>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let mut sock =
        TcpSocket::with_opener(StreamOpen::new(stream), Config::new());
    sock.open(&Endpoint::tcp(SocketAddr::from(([192, 0, 2, 1], 53))))
        .await
        .unwrap();
    sock
}

//------------ UDP -----------------------------------------------------------

#[tokio::test]
async fn udp_round_trip() {
    init_logging();
    let mut server = UdpSocket::new();
    server.open(&udp_loopback()).await.unwrap();
    let mut client = UdpSocket::new();
    client.open(&udp_loopback()).await.unwrap();
    let server_ep = server.local_endpoint().unwrap();
    let client_ep = client.local_endpoint().unwrap();
    assert_ne!(server_ep.port(), 0);

    let query = b"\x12\x34 not really a query".to_vec();
    assert_eq!(
        send(&client, query.clone(), &server_ep).await.unwrap(),
        query.len()
    );

    let (res, buf) = receive(&server, 512).await;
    let received = res.unwrap();
    assert_eq!(received.length, query.len());
    assert_eq!(received.source, client_ep);
    assert_eq!(buf.as_ref(), query.as_slice());
}

#[tokio::test]
async fn udp_datagram_larger_than_capacity() {
    init_logging();
    let mut server = UdpSocket::new();
    server.open(&udp_loopback()).await.unwrap();
    let mut client = UdpSocket::new();
    client.open(&udp_loopback()).await.unwrap();
    let server_ep = server.local_endpoint().unwrap();

    send(&client, vec![0xaa; 100], &server_ep).await.unwrap();
    let (res, buf) = receive(&server, 50).await;
    assert!(matches!(
        res,
        Err(Error::BufferOverflow { capacity: 50, .. })
    ));
    assert!(buf.is_empty());

    // The socket remains usable for the next datagram.
    send(&client, vec![0xbb; 50], &server_ep).await.unwrap();
    let (res, buf) = receive(&server, 50).await;
    assert_eq!(res.unwrap().length, 50);
    assert_eq!(buf.as_ref(), &[0xbb; 50][..]);
    assert_eq!(server.counters().num_read_errors(), 1);
}

//------------ TCP -----------------------------------------------------------

#[tokio::test]
async fn tcp_exchange_with_real_peer() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server_ep = Endpoint::tcp(listener.local_addr().unwrap());
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let len = stream.read_u16().await.unwrap();
        let mut query = vec![0; usize::from(len)];
        stream.read_exact(&mut query).await.unwrap();

        // Answer in two pieces to force the client to reassemble.
        let mut answer = (query.len() as u16).to_be_bytes().to_vec();
        answer.extend_from_slice(&query);
        stream.write_all(&answer[..3]).await.unwrap();
        stream.flush().await.unwrap();
        sleep(Duration::from_millis(20)).await;
        stream.write_all(&answer[3..]).await.unwrap();
        query
    });

    let mut client = TcpSocket::new();
    client.open(&server_ep).await.unwrap();
    assert_eq!(client.peer_endpoint(), Some(server_ep));
    let query = b"example query".to_vec();
    assert_eq!(send(&client, query.clone(), &server_ep).await.unwrap(), 13);

    let (res, buf) = receive(&client, 512).await;
    assert_eq!(res.unwrap().source, server_ep);
    assert_eq!(buf.as_ref(), query.as_slice());
    assert_eq!(server.await.unwrap(), query);
}

#[tokio::test]
async fn tcp_connection_refused_is_a_transport_error() {
    init_logging();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let counters = Arc::new(SocketCounters::new());
    let mut sock = TcpSocket::new().with_counters(counters.clone());
    let err = sock.open(&Endpoint::tcp(addr)).await.unwrap_err();
    assert!(err.is_transport());
    assert!(!sock.is_open());
    assert_eq!(counters.num_open_errors(), 1);
}

#[tokio::test]
async fn tcp_message_in_partial_writes_reaches_peer_once() {
    init_logging();
    let payload: Vec<u8> = (1..=15).collect();
    let mut frame = vec![0, 15];
    frame.extend_from_slice(&payload);
    assert_eq!(frame.len(), 17);

    // The sending side only takes 10 and then 7 bytes per write. The wait
    // keeps the mock from taking both pieces at once.
    let sender = tcp_over(
        tokio_test::io::Builder::new()
            .write(&frame[..10])
            .wait(Duration::from_millis(1))
            .write(&frame[10..])
            .build(),
    )
    .await;
    // The peer sees the bytes arrive in the same two pieces.
    let receiver = tcp_over(
        tokio_test::io::Builder::new()
            .read(&frame[..10])
            .read(&frame[10..])
            .build(),
    )
    .await;

    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = oneshot::channel();
    let counter = calls.clone();
    receiver
        .async_receive(
            BytesMut::new(),
            512,
            Box::new(move |res, buf| {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send((res, buf));
            }),
        )
        .unwrap();

    let peer = receiver.peer_endpoint().unwrap();
    assert_eq!(send(&sender, payload.clone(), &peer).await.unwrap(), 15);

    let (res, buf) = rx.await.unwrap();
    assert_eq!(res.unwrap().length, 15);
    assert_eq!(buf.as_ref(), payload.as_slice());
    sleep(Duration::from_millis(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tcp_duplex_end_to_end() {
    init_logging();
    let (a, b) = tokio::io::duplex(10);
    let left = tcp_over(a).await;
    let right = tcp_over(b).await;
    let dest = right.peer_endpoint().unwrap();

    let payload: Vec<u8> = (0..200).map(|i| i as u8).collect();
    let receiving = receive(&right, 512);
    let sending = send(&left, payload.clone(), &dest);
    let ((res, buf), sent) = tokio::join!(receiving, sending);
    assert_eq!(sent.unwrap(), 200);
    assert_eq!(res.unwrap().length, 200);
    assert_eq!(buf.as_ref(), payload.as_slice());
}

//------------ Generic interface ---------------------------------------------

#[tokio::test]
async fn sockets_by_protocol() {
    init_logging();
    let udp = new_socket(Protocol::Udp, Config::new());
    assert_eq!(udp.protocol(), Protocol::Udp);
    assert!(udp.is_open_synchronous());
    assert!(!udp.is_open());

    let tcp = new_socket(Protocol::Tcp, Config::new());
    assert_eq!(tcp.protocol(), Protocol::Tcp);
    assert!(!tcp.is_open_synchronous());

    for sock in [udp, tcp] {
        let dest = Endpoint::new(
            sock.protocol(),
            SocketAddr::from(([127, 0, 0, 1], 53)),
        );
        let res = sock.async_send(
            Bytes::from_static(b"x"),
            &dest,
            Box::new(|_, _| panic!("completion called")),
        );
        assert!(matches!(res, Err(Error::SocketNotOpen)));
    }
}

#[tokio::test]
async fn boxed_udp_socket_lifecycle() {
    init_logging();
    let mut config = Config::new();
    config.set_max_buffer_size(1232);
    let mut sock = new_socket(Protocol::Udp, config);
    sock.open(&udp_loopback()).await.unwrap();
    assert!(sock.is_open());

    // Opening again is a no-op.
    sock.open(&udp_loopback()).await.unwrap();

    let res = sock.async_receive(
        BytesMut::new(),
        4096,
        Box::new(|_, _| panic!("completion called")),
    );
    assert!(matches!(res, Err(Error::BufferTooLarge { max: 1232, .. })));

    let (tx, rx) = oneshot::channel();
    sock.async_receive(
        BytesMut::new(),
        512,
        Box::new(move |res, _| {
            let _ = tx.send(res);
        }),
    )
    .unwrap();
    sock.close();
    sock.close();
    assert!(matches!(rx.await.unwrap(), Err(Error::Cancelled)));

    // A closed socket can be opened again.
    sock.open(&udp_loopback()).await.unwrap();
    assert!(sock.is_open());
}

#[tokio::test]
async fn counters_are_shared() {
    init_logging();
    let counters = Arc::new(SocketCounters::new());
    let mut first = UdpSocket::new().with_counters(counters.clone());
    let mut second = UdpSocket::new().with_counters(counters.clone());
    first.open(&udp_loopback()).await.unwrap();
    second.open(&udp_loopback()).await.unwrap();
    assert_eq!(counters.num_opens(), 2);

    let (tx, rx) = oneshot::channel();
    first
        .async_receive(
            BytesMut::new(),
            512,
            Box::new(move |res, _| {
                let _ = tx.send(res);
            }),
        )
        .unwrap();
    drop(first);
    assert!(matches!(rx.await.unwrap(), Err(Error::Cancelled)));
    assert_eq!(counters.num_cancelled(), 1);
}
