//! Static region to endpoint host table.

/// Known regions and the S3 endpoint host each one maps to.
///
/// Short aliases (`us-east`, `eu-west`, ...) are kept as separate entries
/// and resolve to the same host as their numbered counterparts.
pub const REGION_ENDPOINTS: &[(&str, &str)] = &[
    ("us-east", "s3.amazonaws.com"),
    ("us-east-1", "s3.amazonaws.com"),
    ("us-west", "s3-us-west-1.amazonaws.com"),
    ("us-west-1", "s3-us-west-1.amazonaws.com"),
    ("us-west-2", "s3-us-west-2.amazonaws.com"),
    ("ap-southeast", "s3-ap-southeast-1.amazonaws.com"),
    ("ap-southeast-1", "s3-ap-southeast-1.amazonaws.com"),
    ("ap-southeast-2", "s3-ap-southeast-2.amazonaws.com"),
    ("ap-northeast", "s3-ap-northeast-1.amazonaws.com"),
    ("ap-northeast-1", "s3-ap-northeast-1.amazonaws.com"),
    ("eu-west", "s3-eu-west-1.amazonaws.com"),
    ("eu-west-1", "s3-eu-west-1.amazonaws.com"),
    ("sa-east", "s3-sa-east-1.amazonaws.com"),
    ("sa-east-1", "s3-sa-east-1.amazonaws.com"),
];

/// Look up the endpoint host for a region, ignoring case.
pub fn endpoint_for_region(region: &str) -> Option<&'static str> {
    REGION_ENDPOINTS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(region))
        .map(|(_, host)| *host)
}

/// All region names the table knows about.
pub fn known_regions() -> impl Iterator<Item = &'static str> {
    REGION_ENDPOINTS.iter().map(|(name, _)| *name)
}
