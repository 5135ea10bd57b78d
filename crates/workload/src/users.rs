//! Synthetic user population.
//!
//! Provides a `UserFactory` that invents users with plausible device profiles
//! and a `UserPool` that owns every user for the lifetime of the process. The
//! pool grows as users are "acquired" and hands out daily-active subsets as
//! shared references.

use crate::distribution::{sample_distinct, WeightedTable};
use clickstream_types::{Device, Platform, User, UserId};
use rand::Rng;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::info;

/// (brand, model, os versions, width, height)
type DeviceProfile = (&'static str, &'static str, &'static [&'static str], u32, u32);

const ANDROID_DEVICES: &[DeviceProfile] = &[
    ("Samsung", "Galaxy S23", &["13", "14"], 1080, 2340),
    ("Samsung", "Galaxy A54", &["13", "14"], 1080, 2340),
    ("Google", "Pixel 8", &["14"], 1080, 2400),
    ("Xiaomi", "Redmi Note 12", &["12", "13"], 1080, 2400),
    ("OnePlus", "11", &["13", "14"], 1440, 3216),
];

const IOS_DEVICES: &[DeviceProfile] = &[
    ("Apple", "iPhone 15", &["17.1", "17.2"], 1179, 2556),
    ("Apple", "iPhone 14", &["16.6", "17.1"], 1170, 2532),
    ("Apple", "iPhone SE", &["16.6"], 750, 1334),
    ("Apple", "iPad Air", &["17.1"], 1640, 2360),
];

const WEB_BROWSERS: &[DeviceProfile] = &[
    ("Google", "Chrome", &["120.0"], 1920, 1080),
    ("Mozilla", "Firefox", &["121.0"], 1536, 864),
    ("Apple", "Safari", &["17.2"], 1440, 900),
    ("Microsoft", "Edge", &["120.0"], 1366, 768),
];

const LOCALES: &[&str] = &["en_US", "en_GB", "de_DE", "fr_FR", "ja_JP", "zh_CN", "es_ES"];

/// Creates new synthetic users.
#[derive(Clone, Debug)]
pub struct UserFactory {
    platforms: WeightedTable<Platform>,
}

impl UserFactory {
    /// Factory with the default platform mix (Android 55%, iOS 30%, web 15%).
    pub fn new() -> Self {
        Self::with_platform_weights(55, 30, 15)
    }

    /// Factory with a custom platform mix.
    ///
    /// Falls back to Android-only if every weight is zero.
    pub fn with_platform_weights(android: u32, ios: u32, web: u32) -> Self {
        let platforms = WeightedTable::new(vec![
            (Platform::Android, android),
            (Platform::IOS, ios),
            (Platform::Web, web),
        ])
        .or_else(|| WeightedTable::new(vec![(Platform::Android, 1)]))
        .expect("single non-zero weight is always a valid table");
        Self { platforms }
    }

    /// Create one user.
    pub fn new_user<R: Rng + ?Sized>(&self, rng: &mut R) -> User {
        let platform = *self.platforms.sample(rng);
        let profiles = match platform {
            Platform::Android => ANDROID_DEVICES,
            Platform::IOS => IOS_DEVICES,
            Platform::Web => WEB_BROWSERS,
        };
        let (brand, model, os_versions, width, height) =
            profiles[rng.gen_range(0..profiles.len())];

        let device = Device {
            brand: brand.to_string(),
            model: model.to_string(),
            os_version: os_versions[rng.gen_range(0..os_versions.len())].to_string(),
            screen_width: width,
            screen_height: height,
            locale: LOCALES[rng.gen_range(0..LOCALES.len())].to_string(),
            ip_address: random_public_ipv4(rng),
        };

        User::new(UserId::random(rng), platform, device)
    }
}

impl Default for UserFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Random unicast address outside 0/8, 10/8 and 127/8.
fn random_public_ipv4<R: Rng + ?Sized>(rng: &mut R) -> Ipv4Addr {
    loop {
        let first: u8 = rng.gen_range(1..=223);
        if first != 10 && first != 127 {
            return Ipv4Addr::new(first, rng.gen(), rng.gen(), rng.gen_range(1..=254));
        }
    }
}

/// Process-wide pool of synthetic users.
pub struct UserPool {
    users: Vec<Arc<User>>,
    factory: UserFactory,
}

impl UserPool {
    /// Create an empty pool.
    pub fn new(factory: UserFactory) -> Self {
        Self {
            users: Vec::new(),
            factory,
        }
    }

    /// Create a pool populated with `count` users.
    pub fn generate<R: Rng + ?Sized>(factory: UserFactory, count: usize, rng: &mut R) -> Self {
        let mut pool = Self::new(factory);
        pool.grow(count, rng);
        info!(users = pool.len(), "Generated user pool");
        pool
    }

    /// Create a pool from existing users.
    pub fn from_users(factory: UserFactory, users: Vec<Arc<User>>) -> Self {
        Self { users, factory }
    }

    /// Add `count` newly acquired users. Returns the new pool size.
    pub fn grow<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) -> usize {
        self.users.reserve(count);
        for _ in 0..count {
            self.users.push(Arc::new(self.factory.new_user(rng)));
        }
        self.users.len()
    }

    /// Draw `k` distinct users (all of them if the pool is smaller).
    pub fn sample<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Vec<Arc<User>> {
        sample_distinct(&self.users, k, rng)
    }

    /// All users.
    pub fn users(&self) -> &[Arc<User>] {
        &self.users
    }

    /// Number of users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn test_generate_and_grow() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut pool = UserPool::generate(UserFactory::new(), 20, &mut rng);
        assert_eq!(pool.len(), 20);

        assert_eq!(pool.grow(5, &mut rng), 25);
        let ids: HashSet<_> = pool.users().iter().map(|u| u.id).collect();
        assert_eq!(ids.len(), 25, "user ids should be unique");
    }

    #[test]
    fn test_sample_is_distinct_and_capped() {
        let mut rng = ChaCha8Rng::seed_from_u64(43);
        let pool = UserPool::generate(UserFactory::new(), 10, &mut rng);

        let sample = pool.sample(4, &mut rng);
        let ids: HashSet<_> = sample.iter().map(|u| u.id).collect();
        assert_eq!(ids.len(), 4);

        assert_eq!(pool.sample(100, &mut rng).len(), 10);
    }

    #[test]
    fn test_sample_shares_users_with_pool() {
        let mut rng = ChaCha8Rng::seed_from_u64(44);
        let pool = UserPool::generate(UserFactory::new(), 3, &mut rng);
        let sample = pool.sample(3, &mut rng);

        sample[0].begin_window(9);
        let same = pool
            .users()
            .iter()
            .find(|u| u.id == sample[0].id)
            .unwrap();
        assert_eq!(same.total_window_events(), 9);
    }

    #[test]
    fn test_platform_weights_are_respected() {
        let mut rng = ChaCha8Rng::seed_from_u64(45);
        let factory = UserFactory::with_platform_weights(0, 0, 1);
        for _ in 0..20 {
            let user = factory.new_user(&mut rng);
            assert_eq!(user.platform, Platform::Web);
            let first = user.device.ip_address.octets()[0];
            assert!(first != 0 && first != 10 && first != 127);
        }
    }
}
