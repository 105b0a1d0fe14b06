//! Catalog bootstrap against a fake catalog server.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use sbpro_client::{Client, ClientConfig, ClientError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Accepts one connection, checks the request, and answers with `payload`.
async fn spawn_catalog_server(payload: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 256];
        let request = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client hung up before sending a full request");
            buf.extend_from_slice(&chunk[..n]);
            let mut text = String::new();
            if GzDecoder::new(&buf[..]).read_to_string(&mut text).is_ok() {
                break text;
            }
        };
        assert_eq!(request, "<ms>symbols</me>");

        stream.write_all(&gzip(payload.as_bytes())).await.unwrap();
        stream.shutdown().await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_connect_loads_catalog() {
    let addr = spawn_catalog_server("<ms>6E_5_100000!03-16*03-17|GC_1_10!04-20|</me>").await;
    let config = ClientConfig {
        catalog_server: addr,
        ..ClientConfig::default()
    };

    let client = Client::connect("key", config).await.unwrap();
    let catalog = client.catalog();
    assert_eq!(catalog.names(), ["6E", "GC"]);

    let euro = client.symbol("6E").unwrap();
    assert_eq!(euro.tick_cost(), 100_000);
    let contracts: Vec<String> = euro.contracts().iter().map(ToString::to_string).collect();
    assert_eq!(contracts, ["03-17", "03-16"]);
}

#[tokio::test]
async fn test_connect_rejects_malformed_catalog() {
    let addr = spawn_catalog_server("<ms>6E_100000!03-16</me>").await;
    let config = ClientConfig {
        catalog_server: addr,
        ..ClientConfig::default()
    };

    let result = Client::connect("key", config).await;
    assert!(matches!(result, Err(ClientError::Catalog(_))));
}
