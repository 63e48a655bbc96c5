use std::env;

use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Config;

use super::interface::Storage;

#[derive(thiserror::Error, Debug)]
#[error("missing environment variable {0}")]
pub struct MissingStorageVar(&'static str);

fn storage_var(name: &'static str) -> Result<String, MissingStorageVar> {
    env::var(name).map_err(|_| MissingStorageVar(name))
}

pub fn setup_storage() -> Result<Storage, MissingStorageVar> {
    let bucket_name = storage_var("S3_BUCKET")?;

    let credentials = Credentials::from_keys(
        storage_var("S3_ACCESS_KEY")?,
        storage_var("S3_SECRET_KEY")?,
        None,
    );

    let config = Config::builder()
        .region(Region::new(storage_var("S3_REGION")?))
        // path-style addressing so MinIO-like endpoints work out of the box
        .force_path_style(true)
        .credentials_provider(credentials)
        .endpoint_url(storage_var("S3_ENDPOINT")?)
        .build();

    Ok(Storage::new(bucket_name, config))
}
