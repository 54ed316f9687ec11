//! Statistics service - loads attendance from the store and hands it to the
//! pure aggregators in `biogate-reports`.

use crate::error::{BusinessError, BusinessResult};
use crate::services::ServiceContext;
use biogate_core::Member;
use biogate_persistence::{AccessLogRepo, AttendanceRepo, DeviceRepo, MemberFilter, MemberRepo};
use biogate_reports::{AttendanceReport, AttendanceStatistics, DailySummary};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

/// Dashboard figures
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub members: i64,
    pub devices_total: usize,
    pub devices_online: usize,
    pub access_events: i64,
    pub today: DailySummary,
}

pub struct StatisticsService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> StatisticsService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Statistics of one member over `[start, end]`
    pub async fn member_statistics(
        &self,
        member_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BusinessResult<AttendanceStatistics> {
        let member = self.require_member(member_id).await?;
        let records =
            AttendanceRepo::list_range(self.ctx.pool(), Some(member_id), start, end).await?;
        Ok(AttendanceStatistics::compute(member_id, start, end, &records).with_name(&member.name))
    }

    /// Report over `[start, end]` for one member, or every member when `None`
    pub async fn report(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        member_id: Option<i64>,
    ) -> BusinessResult<AttendanceReport> {
        let members: Vec<(i64, String)> = match member_id {
            Some(id) => {
                let member = self.require_member(id).await?;
                vec![(member.id, member.name)]
            }
            None => MemberRepo::list(self.ctx.pool(), &MemberFilter::default())
                .await?
                .into_iter()
                .map(|m| (m.id, m.name))
                .collect(),
        };

        let records = if start <= end {
            AttendanceRepo::list_range(self.ctx.pool(), member_id, start, end).await?
        } else {
            Vec::new()
        };
        debug!(%start, %end, members = members.len(), records = records.len(), "Building report");

        Ok(AttendanceReport::build(
            start,
            end,
            &members,
            &records,
            self.ctx.now(),
        ))
    }

    pub async fn daily_summary(&self, date: NaiveDate) -> BusinessResult<DailySummary> {
        let records = AttendanceRepo::list_range(self.ctx.pool(), None, date, date).await?;
        Ok(DailySummary::compute(date, &records))
    }

    pub async fn overview(&self) -> BusinessResult<Overview> {
        let devices = DeviceRepo::list(self.ctx.pool(), None).await?;
        Ok(Overview {
            members: MemberRepo::count(self.ctx.pool()).await?,
            devices_total: devices.len(),
            devices_online: devices.iter().filter(|d| d.is_online()).count(),
            access_events: AccessLogRepo::count(self.ctx.pool()).await?,
            today: self.daily_summary(self.ctx.now().date()).await?,
        })
    }

    async fn require_member(&self, id: i64) -> BusinessResult<Member> {
        MemberRepo::find_by_id(self.ctx.pool(), id)
            .await?
            .ok_or_else(|| BusinessError::MemberNotFound(id).into())
    }
}
