#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    studygroup_api::run().await;
}
