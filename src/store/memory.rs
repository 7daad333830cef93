//! In-process store backed by a JSON snapshot file

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use super::{
    ContractFilter, CrmStore, InstallmentFilter, QuoteFilter, StoreError, StoreResult,
};
use crate::model::{
    Bordereau, Broker, Contract, PaymentInstallment, PaymentSchedule, Quote, ScheduleStatus,
};

/// Every table of the CRM, as stored in the snapshot file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrmData {
    pub brokers: Vec<Broker>,
    pub quotes: Vec<Quote>,
    pub contracts: Vec<Contract>,
    pub payment_schedules: Vec<PaymentSchedule>,
    pub payment_installments: Vec<PaymentInstallment>,
    pub bordereaux: Vec<Bordereau>,
}

impl CrmData {
    pub fn load<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write to a sibling temp file, then rename it over `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> StoreResult<()> {
        let path = path.as_ref();
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let written = File::create(&tmp)
            .map_err(StoreError::from)
            .and_then(|file| {
                let mut writer = BufWriter::new(file);
                serde_json::to_writer_pretty(&mut writer, self)?;
                writer.flush()?;
                writer.get_ref().sync_all()?;
                Ok(())
            })
            .and_then(|()| fs::rename(&tmp, path).map_err(StoreError::from));
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        written
    }
}

/// Thread-safe in-memory tables, optionally written through to a file
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<CrmData>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new(data: CrmData) -> Self {
        Self {
            data: RwLock::new(data),
            path: None,
        }
    }

    /// Load a snapshot and write every committed update back to it
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = CrmData::load(&path)?;
        Ok(Self {
            data: RwLock::new(data),
            path: Some(path),
        })
    }

    /// Load a snapshot without writing updates back
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Ok(Self::new(CrmData::load(path)?))
    }

    /// Copy of the current tables
    pub fn snapshot(&self) -> StoreResult<CrmData> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, CrmData>> {
        self.data
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, CrmData>> {
        self.data
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    /// Apply one update and persist it; each call is its own commit
    ///
    /// The update runs on a copy of the tables. The copy replaces the live
    /// tables only once the snapshot file has been written.
    fn commit<T>(&self, update: impl FnOnce(&mut CrmData) -> StoreResult<T>) -> StoreResult<T> {
        let mut data = self.write()?;
        let mut next = data.clone();
        let value = update(&mut next)?;
        if let Some(path) = &self.path {
            debug!("persisting store snapshot to {}", path.display());
            next.save(path)?;
        }
        *data = next;
        Ok(value)
    }
}

impl CrmStore for MemoryStore {
    fn broker(&self, id: &str) -> StoreResult<Option<Broker>> {
        Ok(self.read()?.brokers.iter().find(|b| b.id == id).cloned())
    }

    fn brokers(&self) -> StoreResult<Vec<Broker>> {
        Ok(self.read()?.brokers.clone())
    }

    fn quote(&self, id: &str) -> StoreResult<Option<Quote>> {
        Ok(self.read()?.quotes.iter().find(|q| q.id == id).cloned())
    }

    fn quotes(&self, filter: &QuoteFilter) -> StoreResult<Vec<Quote>> {
        Ok(self
            .read()?
            .quotes
            .iter()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect())
    }

    fn update_quote(&self, quote: &Quote) -> StoreResult<()> {
        self.commit(|data| {
            let slot = data
                .quotes
                .iter_mut()
                .find(|q| q.id == quote.id)
                .ok_or_else(|| StoreError::Missing(format!("quote {}", quote.id)))?;
            *slot = quote.clone();
            Ok(())
        })
    }

    fn contracts(&self, filter: &ContractFilter) -> StoreResult<Vec<Contract>> {
        Ok(self
            .read()?
            .contracts
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }

    fn contract_for_quote(&self, quote_id: &str) -> StoreResult<Option<Contract>> {
        Ok(self
            .read()?
            .contracts
            .iter()
            .find(|c| c.quote_id == quote_id)
            .cloned())
    }

    fn schedule(&self, id: &str) -> StoreResult<Option<PaymentSchedule>> {
        Ok(self
            .read()?
            .payment_schedules
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    fn schedules(&self) -> StoreResult<Vec<PaymentSchedule>> {
        Ok(self.read()?.payment_schedules.clone())
    }

    fn schedule_for_quote(&self, quote_id: &str) -> StoreResult<Option<PaymentSchedule>> {
        Ok(self
            .read()?
            .payment_schedules
            .iter()
            .find(|s| s.quote_id == quote_id)
            .cloned())
    }

    fn insert_schedule(
        &self,
        schedule: &PaymentSchedule,
        installments: &[PaymentInstallment],
    ) -> StoreResult<()> {
        self.commit(|data| {
            if data.payment_schedules.iter().any(|s| s.id == schedule.id) {
                return Err(StoreError::Duplicate(format!("schedule {}", schedule.id)));
            }
            data.payment_schedules.push(schedule.clone());
            data.payment_installments.extend(installments.iter().cloned());
            Ok(())
        })
    }

    fn update_schedule_status(
        &self,
        id: &str,
        status: ScheduleStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.commit(|data| {
            let schedule = data
                .payment_schedules
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| StoreError::Missing(format!("schedule {}", id)))?;
            schedule.status = status;
            schedule.updated_at = updated_at;
            Ok(())
        })
    }

    fn installment(&self, id: &str) -> StoreResult<Option<PaymentInstallment>> {
        Ok(self
            .read()?
            .payment_installments
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    fn installments(&self, filter: &InstallmentFilter) -> StoreResult<Vec<PaymentInstallment>> {
        let mut rows: Vec<PaymentInstallment> = self
            .read()?
            .payment_installments
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.schedule_id
                .cmp(&b.schedule_id)
                .then(a.number.cmp(&b.number))
        });
        Ok(rows)
    }

    fn update_installment(&self, installment: &PaymentInstallment) -> StoreResult<()> {
        self.commit(|data| {
            let slot = data
                .payment_installments
                .iter_mut()
                .find(|i| i.id == installment.id)
                .ok_or_else(|| StoreError::Missing(format!("installment {}", installment.id)))?;
            *slot = installment.clone();
            Ok(())
        })
    }

    fn update_installment_with_schedule(
        &self,
        installment: &PaymentInstallment,
        status: ScheduleStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.commit(|data| {
            let slot = data
                .payment_installments
                .iter_mut()
                .find(|i| i.id == installment.id)
                .ok_or_else(|| StoreError::Missing(format!("installment {}", installment.id)))?;
            *slot = installment.clone();
            let schedule = data
                .payment_schedules
                .iter_mut()
                .find(|s| s.id == installment.schedule_id)
                .ok_or_else(|| StoreError::Missing(format!("schedule {}", installment.schedule_id)))?;
            schedule.status = status;
            schedule.updated_at = updated_at;
            Ok(())
        })
    }

    fn update_installment_amounts(&self, id: &str, amount_ht: f64, amount_ttc: f64) -> StoreResult<()> {
        self.commit(|data| {
            let slot = data
                .payment_installments
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or_else(|| StoreError::Missing(format!("installment {}", id)))?;
            slot.amount_ht = amount_ht;
            slot.amount_ttc = amount_ttc;
            Ok(())
        })
    }

    fn insert_bordereau(&self, bordereau: &Bordereau) -> StoreResult<()> {
        self.commit(|data| {
            if data.bordereaux.iter().any(|b| b.id == bordereau.id) {
                return Err(StoreError::Duplicate(format!("bordereau {}", bordereau.id)));
            }
            data.bordereaux.push(bordereau.clone());
            Ok(())
        })
    }

    fn bordereau(&self, id: &str) -> StoreResult<Option<Bordereau>> {
        Ok(self.read()?.bordereaux.iter().find(|b| b.id == id).cloned())
    }

    fn bordereaux(&self, skip: i64, take: i64) -> StoreResult<Vec<Bordereau>> {
        if skip < 0 {
            return Err(StoreError::InvalidQuery(format!("skip must be >= 0, got {}", skip)));
        }
        if take < 0 {
            return Err(StoreError::InvalidQuery(format!("take must be >= 0, got {}", take)));
        }
        let mut rows = self.read()?.bordereaux.clone();
        rows.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        Ok(rows
            .into_iter()
            .skip(skip as usize)
            .take(take as usize)
            .collect())
    }

    fn count_bordereaux(&self) -> StoreResult<usize> {
        Ok(self.read()?.bordereaux.len())
    }
}
