use std::error::Error;

use ai_llm_service::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env is fine; the process environment may carry everything.
    match dotenvy::dotenv() {
        Err(e) if !e.not_found() => return Err(e.into()),
        _ => {}
    }

    telemetry::init("info")?;

    api::start().await?;

    Ok(())
}
