use tracing::error;

#[tokio::main]
async fn main() {
    if let Err(error) = chatrelay::run().await {
        error!("Gateway exited with error: {}", error);
        std::process::exit(1);
    }
}
