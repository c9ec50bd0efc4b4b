use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use analysis_core::RiskProfile;
use rust_decimal::Decimal;

use crate::error::PortfolioError;
use crate::metrics::{by_roi_desc, PerformanceMetrics};
use crate::portfolio::{Portfolio, PriceMap};

/// Named portfolios, for comparing strategies side by side.
#[derive(Debug, Default)]
pub struct PortfolioManager {
    portfolios: BTreeMap<String, Portfolio>,
}

impl PortfolioManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        name: &str,
        initial_capital: Decimal,
        profile: RiskProfile,
    ) -> Result<&mut Portfolio, PortfolioError> {
        if self.portfolios.contains_key(name) {
            return Err(PortfolioError::AlreadyExists(name.to_string()));
        }
        Ok(self
            .portfolios
            .entry(name.to_string())
            .or_insert_with(|| Portfolio::new(name, initial_capital, profile)))
    }

    pub fn get(&self, name: &str) -> Option<&Portfolio> {
        self.portfolios.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Portfolio> {
        self.portfolios.get_mut(name)
    }

    pub fn delete(&mut self, name: &str) -> Result<Portfolio, PortfolioError> {
        self.portfolios
            .remove(name)
            .ok_or_else(|| PortfolioError::PortfolioNotFound(name.to_string()))
    }

    pub fn list(&self) -> Vec<String> {
        self.portfolios.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.portfolios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portfolios.is_empty()
    }

    /// Metrics for every portfolio, best ROI first.
    pub fn compare(&self, prices: &PriceMap) -> Vec<PerformanceMetrics> {
        let mut metrics: Vec<PerformanceMetrics> =
            self.portfolios.values().map(|p| p.performance_metrics(prices)).collect();
        metrics.sort_by(by_roi_desc);
        metrics
    }

    /// Write each portfolio to its own JSON file under `dir`.
    pub fn save_all(&self, dir: impl AsRef<Path>) -> Result<usize, PortfolioError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        for portfolio in self.portfolios.values() {
            portfolio.save(file_for(dir, portfolio.name()))?;
        }
        Ok(self.portfolios.len())
    }

    /// Load every `*.json` portfolio under `dir`. A missing directory gives
    /// an empty manager; unreadable files are skipped.
    pub fn load_all(dir: impl AsRef<Path>) -> Result<Self, PortfolioError> {
        let dir = dir.as_ref();
        let mut manager = Self::new();
        if !dir.exists() {
            tracing::info!("No portfolio directory at {}, starting empty", dir.display());
            return Ok(manager);
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            match Portfolio::load(&path) {
                Ok(portfolio) => {
                    manager.portfolios.insert(portfolio.name().to_string(), portfolio);
                }
                Err(e) => tracing::warn!("Skipping portfolio file {}: {}", path.display(), e),
            }
        }
        tracing::info!("Loaded {} portfolios from {}", manager.len(), dir.display());
        Ok(manager)
    }
}

fn file_for(dir: &Path, name: &str) -> PathBuf {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    dir.join(format!("{}.json", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_create_get_delete() {
        let mut manager = PortfolioManager::new();
        manager.create("Prudent", dec!(5000), RiskProfile::Conservative).unwrap();
        manager.create("Dynamique", dec!(20000), RiskProfile::Aggressive).unwrap();

        assert!(matches!(
            manager.create("Prudent", dec!(1), RiskProfile::Moderate),
            Err(PortfolioError::AlreadyExists(_))
        ));
        assert_eq!(manager.list(), vec!["Dynamique", "Prudent"]);
        assert_eq!(manager.get("Prudent").unwrap().cash(), dec!(5000));

        manager.delete("Prudent").unwrap();
        assert!(manager.get("Prudent").is_none());
        assert!(matches!(manager.delete("Prudent"), Err(PortfolioError::PortfolioNotFound(_))));
    }

    #[test]
    fn test_compare_sorts_by_roi() {
        let mut manager = PortfolioManager::new();
        manager
            .create("A", dec!(10000), RiskProfile::Moderate)
            .unwrap()
            .buy("TN0001600154", "ATTIJARI BANK", 100, dec!(50), day(1))
            .unwrap();
        manager
            .create("B", dec!(10000), RiskProfile::Moderate)
            .unwrap()
            .buy("TN0001800457", "BIAT", 50, dec!(90), day(1))
            .unwrap();
        manager.create("C", dec!(10000), RiskProfile::Moderate).unwrap();

        let prices = PriceMap::from([
            ("TN0001600154".to_string(), dec!(45)),
            ("TN0001800457".to_string(), dec!(99)),
        ]);
        let ranking: Vec<String> = manager.compare(&prices).into_iter().map(|m| m.portfolio_name).collect();
        assert_eq!(ranking, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_save_and_load_directory() {
        let dir = std::env::temp_dir().join(format!("bvmt_portfolios_{}", std::process::id()));
        let mut manager = PortfolioManager::new();
        manager
            .create("Mon Portefeuille", dec!(10000), RiskProfile::Moderate)
            .unwrap()
            .buy("TN0001100254", "SFBT", 10, dec!(11.53), day(2))
            .unwrap();
        manager.create("Test", dec!(3000), RiskProfile::Aggressive).unwrap();

        assert_eq!(manager.save_all(&dir).unwrap(), 2);
        assert!(dir.join("mon_portefeuille.json").exists());

        let loaded = PortfolioManager::load_all(&dir).unwrap();
        assert_eq!(loaded.list(), vec!["Mon Portefeuille", "Test"]);
        let restored = loaded.get("Mon Portefeuille").unwrap();
        assert_eq!(restored.cash(), dec!(9884.70));
        assert_eq!(restored.holding("TN0001100254").unwrap().quantity, 10);
        assert_eq!(loaded.get("Test").unwrap().profile(), RiskProfile::Aggressive);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_missing_directory_is_empty() {
        let dir = std::env::temp_dir().join("bvmt_portfolios_does_not_exist");
        assert!(PortfolioManager::load_all(dir).unwrap().is_empty());
    }
}
