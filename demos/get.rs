/// Performs one GET over a PSK-secured session and prints the reply.
///
///     cargo run --example get -- coaps://192.168.1.10/15001 <identity> <psk>
extern crate dtlscoap;
use dtlscoap::client::{parse_coaps_url, SecureSessionClient, SessionConfig};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let (Some(url), Some(identity), Some(psk)) = (args.next(), args.next(), args.next()) else {
        eprintln!("usage: get <coaps-url> <identity> <psk>");
        std::process::exit(2);
    };

    let (ip, port, path) = parse_coaps_url(&url).expect("invalid url");
    let config = SessionConfig {
        port,
        receive_timeout: Some(Duration::from_secs(5)),
        ..Default::default()
    };

    let client = SecureSessionClient::connect_with_config(&ip.to_string(), identity, psk, config)
        .await
        .expect("could not create client");
    println!("Client request: {}", url);

    match client.get(&path).await {
        Ok(response) => println!(
            "Server reply: {}",
            String::from_utf8_lossy(&response.message.payload)
        ),
        Err(e) => println!("Request error: {}", e),
    }
    client.close().await.expect("could not close session");
}
