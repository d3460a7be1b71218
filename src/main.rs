//! Giftlist Backend - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    if let Err(e) = giftlist_backend::run().await {
        eprintln!("giftlist-backend: {}", e);
        std::process::exit(1);
    }
}
