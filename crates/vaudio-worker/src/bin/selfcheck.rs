use std::path::Path;

use vaudio_media::{check_ffmpeg, check_ffprobe};
use vaudio_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "vaudio-selfcheck: starting with work_dir={} format={}",
        config.work_dir.display(),
        config.audio_format
    );
    ensure_workdir(&config.work_dir).await?;
    ensure_tool("ffmpeg", check_ffmpeg)?;
    ensure_tool("ffprobe", check_ffprobe)?;

    println!("vaudio-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path).await?;

    let probe = path.join(".vaudio-selfcheck");
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("work dir {} not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

fn ensure_tool<F, T>(name: &str, check: F) -> anyhow::Result<()>
where
    F: FnOnce() -> vaudio_media::MediaResult<T>,
{
    check().map_err(|e| anyhow::anyhow!("{} not available: {}", name, e))?;
    Ok(())
}
