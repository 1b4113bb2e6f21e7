//! AWS SDK configuration.

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Load the shared SDK configuration from the default provider chain.
///
/// `region` overrides whatever the environment or profile resolves.
pub async fn load_sdk_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_owned()));
    }
    loader.load().await
}
