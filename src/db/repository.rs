//! Database repository for CRUD, merge, and dashboard operations.
//!
//! Uses prepared statements throughout; merges run inside a single
//! transaction so a reader never observes a half-migrated state.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate, Utc};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::errors::AppError;
use crate::models::{
    days_until, AdultLeader, AuditLog, CreateFamilyRequest, CreateLeaderRequest,
    CreatePermissionRequest, CreatePersonRequest, CreateScoutRequest, DashboardStatistics,
    DenCount, ExpirationStatus, ExpiringRecords, Family, FamilyCounts, FamilyDetail,
    FamilyMembersReport, FamilySummary, Gender, LeaderCounts, LeaderDetail, PageSpec, Paginated,
    PermissionDetail, Person, PersonCounts, PersonDetail, PersonType, PersonWithFamily,
    RankCount, RecordSyncRequest, RegistrationState, Role, Scout, ScoutCounts, ScoutDetail,
    Setting, SortSpec, SyncLog, SyncStatus, UpdateFamilyRequest, UpdateLeaderRequest,
    UpdatePermissionRequest, UpdatePersonRequest, UpdateScoutRequest, UserPermission,
    YptStatus, YptTraining,
};

const FAMILY_COLS: &str =
    "id, name, street_address, city, state, zip, primary_phone, notes, created_at, updated_at, deleted_at";
const PERSON_COLS: &str = "id, family_id, bsa_member_id, person_type, prefix, first_name, \
     middle_name, last_name, suffix, nickname, gender, date_of_birth, age, email, phone, \
     created_at, updated_at, deleted_at";
const SCOUT_COLS: &str = "id, person_id, grade, rank, den, registration_expiration_date, \
     registration_status, ypt_status, program, created_at, updated_at";
const LEADER_COLS: &str = "id, person_id, positions, ypt_status, ypt_completion_date, \
     ypt_expiration_date, registration_expiration_date, created_at, updated_at";
const PERMISSION_COLS: &str =
    "id, wordpress_user_id, person_id, role, granted_by, granted_at, created_at, updated_at";
const SYNC_COLS: &str = "id, sync_type, status, started_at, completed_at, records_processed, \
     records_created, records_updated, records_skipped, errors, triggered_by, created_at";

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== FAMILY OPERATIONS ====================

    /// List non-deleted families with members loaded, filtered and paged.
    pub async fn list_families(
        &self,
        search: Option<&str>,
        sort: &SortSpec,
        page: &PageSpec,
    ) -> Result<Paginated<FamilyDetail>, AppError> {
        let mut where_sql = String::from("deleted_at IS NULL");
        if search.is_some() {
            where_sql.push_str(" AND (name LIKE ? OR city LIKE ? OR primary_phone LIKE ?)");
        }

        let count_sql = format!("SELECT COUNT(*) FROM families WHERE {}", where_sql);
        let mut count_query = sqlx::query_scalar(&count_sql);
        if let Some(s) = search {
            let pattern = format!("%{}%", s);
            count_query = count_query
                .bind(pattern.clone())
                .bind(pattern.clone())
                .bind(pattern);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?;

        let rows_sql = format!(
            "SELECT {} FROM families WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            FAMILY_COLS,
            where_sql,
            sort.to_sql()
        );
        let mut rows_query = sqlx::query(&rows_sql);
        if let Some(s) = search {
            let pattern = format!("%{}%", s);
            rows_query = rows_query
                .bind(pattern.clone())
                .bind(pattern.clone())
                .bind(pattern);
        }
        let rows = rows_query
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            let family = family_from_row(row);
            let members = self.load_family_members(family.id).await?;
            data.push(group_family_members(family, members));
        }

        Ok(Paginated::new(data, total, page))
    }

    /// Get a non-deleted family by id, without relations.
    pub async fn get_family(&self, id: i64) -> Result<Option<Family>, AppError> {
        let sql = format!(
            "SELECT {} FROM families WHERE id = ? AND deleted_at IS NULL",
            FAMILY_COLS
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(family_from_row))
    }

    /// Get a family with its members grouped by person type.
    pub async fn get_family_detail(&self, id: i64) -> Result<Option<FamilyDetail>, AppError> {
        let Some(family) = self.get_family(id).await? else {
            return Ok(None);
        };
        let members = self.load_family_members(id).await?;
        Ok(Some(group_family_members(family, members)))
    }

    /// Create a family and return it with (empty) member lists.
    pub async fn create_family(
        &self,
        request: &CreateFamilyRequest,
    ) -> Result<FamilyDetail, AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO families (name, street_address, city, state, zip, primary_phone, notes, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.name)
        .bind(&request.street_address)
        .bind(&request.city)
        .bind(&request.state)
        .bind(&request.zip)
        .bind(&request.primary_phone)
        .bind(&request.notes)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit("family", id, "created", None).await;

        self.get_family_detail(id)
            .await?
            .ok_or_else(|| AppError::Internal("family vanished after insert".to_string()))
    }

    /// Partially update a family.
    pub async fn update_family(
        &self,
        id: i64,
        request: &UpdateFamilyRequest,
    ) -> Result<FamilyDetail, AppError> {
        let existing = self
            .get_family(id)
            .await?
            .ok_or_else(|| AppError::not_found("Family", id))?;

        let now = Utc::now().to_rfc3339();
        let name = request.name.as_ref().unwrap_or(&existing.name);
        let street_address = request
            .street_address
            .clone()
            .or(existing.street_address.clone());
        let city = request.city.clone().or(existing.city.clone());
        let state = request.state.clone().or(existing.state.clone());
        let zip = request.zip.clone().or(existing.zip.clone());
        let primary_phone = request
            .primary_phone
            .clone()
            .or(existing.primary_phone.clone());
        let notes = request.notes.clone().or(existing.notes.clone());

        sqlx::query(
            "UPDATE families SET name = ?, street_address = ?, city = ?, state = ?, zip = ?, \
             primary_phone = ?, notes = ?, updated_at = ? WHERE id = ?",
        )
        .bind(name)
        .bind(&street_address)
        .bind(&city)
        .bind(&state)
        .bind(&zip)
        .bind(&primary_phone)
        .bind(&notes)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.audit("family", id, "updated", None).await;

        self.get_family_detail(id)
            .await?
            .ok_or_else(|| AppError::not_found("Family", id))
    }

    /// Soft-delete a family. Its id is terminal afterwards.
    pub async fn delete_family(&self, id: i64) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let result =
            sqlx::query("UPDATE families SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(&now)
                .bind(&now)
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Family", id));
        }

        self.audit("family", id, "deleted", None).await;
        Ok(())
    }

    /// Collapse a duplicate family into a canonical one.
    ///
    /// Every person row pointing at the duplicate (soft-deleted included)
    /// is reassigned to the survivor, then the duplicate is soft-deleted.
    /// Reassignment and deletion commit together or not at all.
    pub async fn merge_families(
        &self,
        primary_id: i64,
        merge_id: i64,
    ) -> Result<FamilyDetail, AppError> {
        if primary_id == merge_id {
            return Err(AppError::validation("cannot merge a family into itself"));
        }

        let mut tx = self.pool.begin().await?;

        for id in [primary_id, merge_id] {
            let exists: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM families WHERE id = ? AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            if exists == 0 {
                return Err(AppError::not_found("Family", id));
            }
        }

        let now = Utc::now().to_rfc3339();

        sqlx::query("UPDATE persons SET family_id = ?, updated_at = ? WHERE family_id = ?")
            .bind(primary_id)
            .bind(&now)
            .bind(merge_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE families SET deleted_at = ?, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&now)
            .bind(merge_id)
            .execute(&mut *tx)
            .await?;

        record_audit_tx(
            &mut tx,
            "family",
            primary_id,
            "merged",
            Some(serde_json::json!({ "merged_id": merge_id })),
        )
        .await?;

        tx.commit().await?;

        self.get_family_detail(primary_id)
            .await?
            .ok_or_else(|| AppError::not_found("Family", primary_id))
    }

    /// Non-deleted members of a family, ordered by name.
    async fn load_family_members(&self, family_id: i64) -> Result<Vec<Person>, AppError> {
        let sql = format!(
            "SELECT {} FROM persons WHERE family_id = ? AND deleted_at IS NULL \
             ORDER BY last_name, first_name",
            PERSON_COLS
        );
        let rows = sqlx::query(&sql)
            .bind(family_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(person_from_row).collect()
    }

    // ==================== PERSON OPERATIONS ====================

    /// List non-deleted persons with relations, filtered and paged.
    #[allow(clippy::too_many_arguments)]
    pub async fn list_persons(
        &self,
        family_id: Option<i64>,
        person_type: Option<PersonType>,
        search: Option<&str>,
        sort: &SortSpec,
        page: &PageSpec,
        today: NaiveDate,
    ) -> Result<Paginated<PersonDetail>, AppError> {
        let mut where_sql = String::from("deleted_at IS NULL");
        if family_id.is_some() {
            where_sql.push_str(" AND family_id = ?");
        }
        if person_type.is_some() {
            where_sql.push_str(" AND person_type = ?");
        }
        if search.is_some() {
            where_sql.push_str(
                " AND (first_name LIKE ? OR last_name LIKE ? OR email LIKE ? OR phone LIKE ?)",
            );
        }

        let pattern = search.map(|s| format!("%{}%", s));

        let count_sql = format!("SELECT COUNT(*) FROM persons WHERE {}", where_sql);
        let count_row =
            bind_person_filters(sqlx::query(&count_sql), family_id, person_type, pattern.as_deref())
                .fetch_one(&self.pool)
                .await?;
        let total: i64 = count_row.get(0);

        let rows_sql = format!(
            "SELECT {} FROM persons WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            PERSON_COLS,
            where_sql,
            sort.to_sql()
        );
        let rows = bind_person_filters(
            sqlx::query(&rows_sql),
            family_id,
            person_type,
            pattern.as_deref(),
        )
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            let person = person_from_row(row)?;
            data.push(self.load_person_relations(person, today).await?);
        }

        Ok(Paginated::new(data, total, page))
    }

    /// Get a non-deleted person by id, without relations.
    pub async fn get_person(&self, id: i64) -> Result<Option<Person>, AppError> {
        let sql = format!(
            "SELECT {} FROM persons WHERE id = ? AND deleted_at IS NULL",
            PERSON_COLS
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(person_from_row).transpose()
    }

    /// Get a person with family, scout, and leader relations.
    pub async fn get_person_detail(
        &self,
        id: i64,
        today: NaiveDate,
    ) -> Result<Option<PersonDetail>, AppError> {
        match self.get_person(id).await? {
            Some(person) => Ok(Some(self.load_person_relations(person, today).await?)),
            None => Ok(None),
        }
    }

    /// Create a person, enforcing uniqueness of bsa_member_id and email
    /// across non-deleted persons.
    pub async fn create_person(
        &self,
        request: &CreatePersonRequest,
        today: NaiveDate,
    ) -> Result<PersonDetail, AppError> {
        self.ensure_person_unique(
            request.email.as_deref(),
            request.bsa_member_id.as_deref(),
            None,
        )
        .await?;
        if let Some(fid) = request.family_id {
            self.ensure_family_exists(fid).await?;
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO persons (family_id, bsa_member_id, person_type, prefix, first_name, \
             middle_name, last_name, suffix, nickname, gender, date_of_birth, age, email, phone, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request.family_id)
        .bind(&request.bsa_member_id)
        .bind(request.person_type.as_str())
        .bind(&request.prefix)
        .bind(&request.first_name)
        .bind(&request.middle_name)
        .bind(&request.last_name)
        .bind(&request.suffix)
        .bind(&request.nickname)
        .bind(request.gender.map(|g| g.as_str()))
        .bind(request.date_of_birth)
        .bind(request.age)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit("person", id, "created", None).await;

        self.get_person_detail(id, today)
            .await?
            .ok_or_else(|| AppError::Internal("person vanished after insert".to_string()))
    }

    /// Partially update a person. Nullable columns distinguish absent
    /// from explicit null, so values can be cleared as well as replaced.
    pub async fn update_person(
        &self,
        id: i64,
        request: &UpdatePersonRequest,
        today: NaiveDate,
    ) -> Result<PersonDetail, AppError> {
        let existing = self
            .get_person(id)
            .await?
            .ok_or_else(|| AppError::not_found("Person", id))?;

        let email = request
            .email
            .clone()
            .unwrap_or_else(|| existing.email.clone());
        let bsa_member_id = request
            .bsa_member_id
            .clone()
            .unwrap_or_else(|| existing.bsa_member_id.clone());
        self.ensure_person_unique(email.as_deref(), bsa_member_id.as_deref(), Some(id))
            .await?;

        let family_id = match request.family_id {
            Some(new_value) => {
                if let Some(fid) = new_value {
                    self.ensure_family_exists(fid).await?;
                }
                new_value
            }
            None => existing.family_id,
        };

        let now = Utc::now().to_rfc3339();
        let person_type = request.person_type.unwrap_or(existing.person_type);
        let prefix = request
            .prefix
            .clone()
            .unwrap_or_else(|| existing.prefix.clone());
        let first_name = request.first_name.as_ref().unwrap_or(&existing.first_name);
        let middle_name = request
            .middle_name
            .clone()
            .unwrap_or_else(|| existing.middle_name.clone());
        let last_name = request.last_name.as_ref().unwrap_or(&existing.last_name);
        let suffix = request
            .suffix
            .clone()
            .unwrap_or_else(|| existing.suffix.clone());
        let nickname = request
            .nickname
            .clone()
            .unwrap_or_else(|| existing.nickname.clone());
        let gender = request.gender.unwrap_or(existing.gender);
        let date_of_birth = request.date_of_birth.unwrap_or(existing.date_of_birth);
        let age = request.age.unwrap_or(existing.age);
        let phone = request
            .phone
            .clone()
            .unwrap_or_else(|| existing.phone.clone());

        sqlx::query(
            "UPDATE persons SET family_id = ?, bsa_member_id = ?, person_type = ?, prefix = ?, \
             first_name = ?, middle_name = ?, last_name = ?, suffix = ?, nickname = ?, gender = ?, \
             date_of_birth = ?, age = ?, email = ?, phone = ?, updated_at = ? WHERE id = ?",
        )
        .bind(family_id)
        .bind(&bsa_member_id)
        .bind(person_type.as_str())
        .bind(&prefix)
        .bind(first_name)
        .bind(&middle_name)
        .bind(last_name)
        .bind(&suffix)
        .bind(&nickname)
        .bind(gender.map(|g| g.as_str()))
        .bind(date_of_birth)
        .bind(age)
        .bind(&email)
        .bind(&phone)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.audit("person", id, "updated", None).await;

        self.get_person_detail(id, today)
            .await?
            .ok_or_else(|| AppError::not_found("Person", id))
    }

    /// Soft-delete a person, excluding it from every relationship query.
    pub async fn delete_person(&self, id: i64) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let result =
            sqlx::query("UPDATE persons SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(&now)
                .bind(&now)
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Person", id));
        }

        self.audit("person", id, "deleted", None).await;
        Ok(())
    }

    /// Search persons that have no family, paged.
    pub async fn search_orphaned(
        &self,
        search: Option<&str>,
        page: &PageSpec,
        today: NaiveDate,
    ) -> Result<Paginated<PersonDetail>, AppError> {
        let mut where_sql = String::from("deleted_at IS NULL AND family_id IS NULL");
        if search.is_some() {
            where_sql.push_str(" AND (first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)");
        }

        let count_sql = format!("SELECT COUNT(*) FROM persons WHERE {}", where_sql);
        let mut count_query = sqlx::query_scalar(&count_sql);
        if let Some(s) = search {
            let pattern = format!("%{}%", s);
            count_query = count_query
                .bind(pattern.clone())
                .bind(pattern.clone())
                .bind(pattern);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?;

        let rows_sql = format!(
            "SELECT {} FROM persons WHERE {} ORDER BY last_name, first_name LIMIT ? OFFSET ?",
            PERSON_COLS, where_sql
        );
        let mut rows_query = sqlx::query(&rows_sql);
        if let Some(s) = search {
            let pattern = format!("%{}%", s);
            rows_query = rows_query
                .bind(pattern.clone())
                .bind(pattern.clone())
                .bind(pattern);
        }
        let rows = rows_query
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            let person = person_from_row(row)?;
            data.push(self.load_person_relations(person, today).await?);
        }

        Ok(Paginated::new(data, total, page))
    }

    /// Collapse a duplicate person into a canonical one.
    ///
    /// The duplicate's scout/leader rows move to the survivor. If both
    /// sides already own a row of the same kind the merge is rejected
    /// with a conflict, leaving everything untouched: the 1:1 person-to-
    /// scout (and person-to-leader) relationship must survive the merge.
    pub async fn merge_persons(
        &self,
        primary_id: i64,
        merge_id: i64,
        today: NaiveDate,
    ) -> Result<PersonDetail, AppError> {
        if primary_id == merge_id {
            return Err(AppError::validation("cannot merge a person into themselves"));
        }

        let mut tx = self.pool.begin().await?;

        for id in [primary_id, merge_id] {
            let exists: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM persons WHERE id = ? AND deleted_at IS NULL",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            if exists == 0 {
                return Err(AppError::not_found("Person", id));
            }
        }

        let primary_scout: Option<i64> =
            sqlx::query_scalar("SELECT id FROM scouts WHERE person_id = ?")
                .bind(primary_id)
                .fetch_optional(&mut *tx)
                .await?;
        let merge_scout: Option<i64> =
            sqlx::query_scalar("SELECT id FROM scouts WHERE person_id = ?")
                .bind(merge_id)
                .fetch_optional(&mut *tx)
                .await?;
        if primary_scout.is_some() && merge_scout.is_some() {
            return Err(AppError::Conflict(
                "both persons have a scout record; resolve the duplicate scout before merging"
                    .to_string(),
            ));
        }

        let primary_leader: Option<i64> =
            sqlx::query_scalar("SELECT id FROM adult_leaders WHERE person_id = ?")
                .bind(primary_id)
                .fetch_optional(&mut *tx)
                .await?;
        let merge_leader: Option<i64> =
            sqlx::query_scalar("SELECT id FROM adult_leaders WHERE person_id = ?")
                .bind(merge_id)
                .fetch_optional(&mut *tx)
                .await?;
        if primary_leader.is_some() && merge_leader.is_some() {
            return Err(AppError::Conflict(
                "both persons have an adult leader record; resolve the duplicate leader before merging"
                    .to_string(),
            ));
        }

        let now = Utc::now().to_rfc3339();

        if let Some(scout_id) = merge_scout {
            sqlx::query("UPDATE scouts SET person_id = ?, updated_at = ? WHERE id = ?")
                .bind(primary_id)
                .bind(&now)
                .bind(scout_id)
                .execute(&mut *tx)
                .await?;
        }
        if let Some(leader_id) = merge_leader {
            sqlx::query("UPDATE adult_leaders SET person_id = ?, updated_at = ? WHERE id = ?")
                .bind(primary_id)
                .bind(&now)
                .bind(leader_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("UPDATE persons SET deleted_at = ?, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&now)
            .bind(merge_id)
            .execute(&mut *tx)
            .await?;

        record_audit_tx(
            &mut tx,
            "person",
            primary_id,
            "merged",
            Some(serde_json::json!({ "merged_id": merge_id })),
        )
        .await?;

        tx.commit().await?;

        self.get_person_detail(primary_id, today)
            .await?
            .ok_or_else(|| AppError::not_found("Person", primary_id))
    }

    async fn load_person_relations(
        &self,
        person: Person,
        today: NaiveDate,
    ) -> Result<PersonDetail, AppError> {
        let family = match person.family_id {
            Some(fid) => self.get_family(fid).await?,
            None => None,
        };
        let scout = self.scout_for_person(person.id, today).await?;
        let leader = self.leader_for_person(person.id, today).await?;
        Ok(PersonDetail {
            person,
            family,
            scout,
            leader,
        })
    }

    /// Load a person and its family for embedding into other payloads.
    async fn person_with_family(
        &self,
        person_id: i64,
    ) -> Result<Option<PersonWithFamily>, AppError> {
        let Some(person) = self.get_person(person_id).await? else {
            return Ok(None);
        };
        let family = match person.family_id {
            Some(fid) => self.get_family(fid).await?,
            None => None,
        };
        Ok(Some(PersonWithFamily { person, family }))
    }

    async fn scout_for_person(
        &self,
        person_id: i64,
        today: NaiveDate,
    ) -> Result<Option<Scout>, AppError> {
        let sql = format!("SELECT {} FROM scouts WHERE person_id = ?", SCOUT_COLS);
        let row = sqlx::query(&sql)
            .bind(person_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(|r| scout_from_row(r, today)))
    }

    async fn leader_for_person(
        &self,
        person_id: i64,
        today: NaiveDate,
    ) -> Result<Option<AdultLeader>, AppError> {
        let sql = format!(
            "SELECT {} FROM adult_leaders WHERE person_id = ?",
            LEADER_COLS
        );
        let row = sqlx::query(&sql)
            .bind(person_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(|r| leader_from_row(r, today)))
    }

    async fn ensure_family_exists(&self, family_id: i64) -> Result<(), AppError> {
        let exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM families WHERE id = ? AND deleted_at IS NULL")
                .bind(family_id)
                .fetch_one(&self.pool)
                .await?;
        if exists == 0 {
            let mut fields = BTreeMap::new();
            fields.insert("family_id".to_string(), "family does not exist".to_string());
            return Err(AppError::validation_fields("validation failed", fields));
        }
        Ok(())
    }

    async fn ensure_person_exists(&self, person_id: i64) -> Result<(), AppError> {
        let exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM persons WHERE id = ? AND deleted_at IS NULL")
                .bind(person_id)
                .fetch_one(&self.pool)
                .await?;
        if exists == 0 {
            let mut fields = BTreeMap::new();
            fields.insert("person_id".to_string(), "person does not exist".to_string());
            return Err(AppError::validation_fields("validation failed", fields));
        }
        Ok(())
    }

    /// Uniqueness of email and bsa_member_id across non-deleted persons,
    /// excluding the person being updated.
    async fn ensure_person_unique(
        &self,
        email: Option<&str>,
        bsa_member_id: Option<&str>,
        exclude_id: Option<i64>,
    ) -> Result<(), AppError> {
        let mut fields = BTreeMap::new();

        if let Some(email) = email {
            let taken: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM persons WHERE deleted_at IS NULL AND email = ? \
                 AND (? IS NULL OR id != ?)",
            )
            .bind(email)
            .bind(exclude_id)
            .bind(exclude_id)
            .fetch_one(&self.pool)
            .await?;
            if taken > 0 {
                fields.insert("email".to_string(), "has already been taken".to_string());
            }
        }

        if let Some(bsa) = bsa_member_id {
            let taken: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM persons WHERE deleted_at IS NULL AND bsa_member_id = ? \
                 AND (? IS NULL OR id != ?)",
            )
            .bind(bsa)
            .bind(exclude_id)
            .bind(exclude_id)
            .fetch_one(&self.pool)
            .await?;
            if taken > 0 {
                fields.insert(
                    "bsa_member_id".to_string(),
                    "has already been taken".to_string(),
                );
            }
        }

        if !fields.is_empty() {
            return Err(AppError::validation_fields("validation failed", fields));
        }
        Ok(())
    }

    // ==================== SCOUT OPERATIONS ====================

    /// List scouts with person/family loaded, filtered and paged.
    /// `status` filters on date-derived buckets against `today`.
    #[allow(clippy::too_many_arguments)]
    pub async fn list_scouts(
        &self,
        den: Option<&str>,
        rank: Option<&str>,
        status: Option<&str>,
        search: Option<&str>,
        sort: &SortSpec,
        page: &PageSpec,
        today: NaiveDate,
    ) -> Result<Paginated<ScoutDetail>, AppError> {
        let mut where_sql = String::from("1 = 1");
        if den.is_some() {
            where_sql.push_str(" AND den = ?");
        }
        if rank.is_some() {
            where_sql.push_str(" AND rank = ?");
        }
        match status {
            Some("active") => where_sql.push_str(
                " AND registration_expiration_date > ? AND registration_status = 'active'",
            ),
            Some("expiring_soon") => where_sql.push_str(
                " AND registration_expiration_date >= ? AND registration_expiration_date < ?",
            ),
            Some("expired") => where_sql.push_str(" AND registration_expiration_date < ?"),
            _ => {}
        }
        if search.is_some() {
            where_sql.push_str(
                " AND person_id IN (SELECT id FROM persons WHERE deleted_at IS NULL AND \
                 (first_name LIKE ? OR last_name LIKE ? OR email LIKE ?))",
            );
        }

        let soon = today + Days::new(30);
        let pattern = search.map(|s| format!("%{}%", s));

        let count_sql = format!("SELECT COUNT(*) FROM scouts WHERE {}", where_sql);
        let count_row = bind_scout_filters(
            sqlx::query(&count_sql),
            den,
            rank,
            status,
            pattern.as_deref(),
            today,
            soon,
        )
        .fetch_one(&self.pool)
        .await?;
        let total: i64 = count_row.get(0);

        let rows_sql = format!(
            "SELECT {} FROM scouts WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            SCOUT_COLS,
            where_sql,
            sort.to_sql()
        );
        let rows = bind_scout_filters(
            sqlx::query(&rows_sql),
            den,
            rank,
            status,
            pattern.as_deref(),
            today,
            soon,
        )
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            let scout = scout_from_row(row, today);
            let person = self.person_with_family(scout.person_id).await?;
            data.push(ScoutDetail { scout, person });
        }

        Ok(Paginated::new(data, total, page))
    }

    /// Get a scout with its person and family loaded.
    pub async fn get_scout_detail(
        &self,
        id: i64,
        today: NaiveDate,
    ) -> Result<Option<ScoutDetail>, AppError> {
        let sql = format!("SELECT {} FROM scouts WHERE id = ?", SCOUT_COLS);
        let Some(row) = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await? else {
            return Ok(None);
        };
        let scout = scout_from_row(&row, today);
        let person = self.person_with_family(scout.person_id).await?;
        Ok(Some(ScoutDetail { scout, person }))
    }

    /// Create a scout record for an existing person.
    pub async fn create_scout(
        &self,
        request: &CreateScoutRequest,
        today: NaiveDate,
    ) -> Result<ScoutDetail, AppError> {
        self.ensure_person_exists(request.person_id).await?;

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO scouts (person_id, grade, rank, den, registration_expiration_date, \
             registration_status, ypt_status, program, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, COALESCE(?, 'Cub Scouting'), ?, ?)",
        )
        .bind(request.person_id)
        .bind(&request.grade)
        .bind(&request.rank)
        .bind(&request.den)
        .bind(request.registration_expiration_date)
        .bind(request.registration_status.map(|s| s.as_str()))
        .bind(request.ypt_status.map(|s| s.as_str()))
        .bind(&request.program)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit("scout", id, "created", None).await;

        self.get_scout_detail(id, today)
            .await?
            .ok_or_else(|| AppError::Internal("scout vanished after insert".to_string()))
    }

    /// Partially update a scout.
    pub async fn update_scout(
        &self,
        id: i64,
        request: &UpdateScoutRequest,
        today: NaiveDate,
    ) -> Result<ScoutDetail, AppError> {
        let existing = self
            .get_scout_detail(id, today)
            .await?
            .ok_or_else(|| AppError::not_found("Scout", id))?
            .scout;

        if let Some(pid) = request.person_id {
            if pid != existing.person_id {
                self.ensure_person_exists(pid).await?;
            }
        }

        let now = Utc::now().to_rfc3339();
        let person_id = request.person_id.unwrap_or(existing.person_id);
        let grade = request.grade.clone().or(existing.grade.clone());
        let rank = request.rank.clone().or(existing.rank.clone());
        let den = request.den.clone().or(existing.den.clone());
        let expiration = request
            .registration_expiration_date
            .or(existing.registration_expiration_date);
        let registration_status = request
            .registration_status
            .or(existing.registration_status);
        let ypt_status = request.ypt_status.or(existing.ypt_status);
        let program = request.program.clone().or(existing.program.clone());

        sqlx::query(
            "UPDATE scouts SET person_id = ?, grade = ?, rank = ?, den = ?, \
             registration_expiration_date = ?, registration_status = ?, ypt_status = ?, \
             program = ?, updated_at = ? WHERE id = ?",
        )
        .bind(person_id)
        .bind(&grade)
        .bind(&rank)
        .bind(&den)
        .bind(expiration)
        .bind(registration_status.map(|s| s.as_str()))
        .bind(ypt_status.map(|s| s.as_str()))
        .bind(&program)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.audit("scout", id, "updated", None).await;

        self.get_scout_detail(id, today)
            .await?
            .ok_or_else(|| AppError::not_found("Scout", id))
    }

    /// Delete a scout record.
    pub async fn delete_scout(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM scouts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Scout", id));
        }

        self.audit("scout", id, "deleted", None).await;
        Ok(())
    }

    /// Active scouts whose registration lapses within `days` of `today`.
    pub async fn expiring_scouts(
        &self,
        days: u32,
        page: &PageSpec,
        today: NaiveDate,
    ) -> Result<Paginated<ScoutDetail>, AppError> {
        let upper = today + Days::new(u64::from(days));

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM scouts WHERE registration_status = 'active' \
             AND registration_expiration_date >= ? AND registration_expiration_date < ?",
        )
        .bind(today)
        .bind(upper)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {} FROM scouts WHERE registration_status = 'active' \
             AND registration_expiration_date >= ? AND registration_expiration_date < ? \
             ORDER BY registration_expiration_date ASC LIMIT ? OFFSET ?",
            SCOUT_COLS
        );
        let rows = sqlx::query(&sql)
            .bind(today)
            .bind(upper)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            let scout = scout_from_row(row, today);
            let person = self.person_with_family(scout.person_id).await?;
            data.push(ScoutDetail { scout, person });
        }

        Ok(Paginated::new(data, total, page))
    }

    /// Active scouts in one den, ordered by rank.
    pub async fn scouts_by_den(
        &self,
        den: &str,
        today: NaiveDate,
    ) -> Result<Vec<ScoutDetail>, AppError> {
        let sql = format!(
            "SELECT {} FROM scouts WHERE den = ? AND registration_status = 'active' \
             ORDER BY rank ASC",
            SCOUT_COLS
        );
        let rows = sqlx::query(&sql).bind(den).fetch_all(&self.pool).await?;

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            let scout = scout_from_row(row, today);
            let person = self.person_with_family(scout.person_id).await?;
            data.push(ScoutDetail { scout, person });
        }
        Ok(data)
    }

    // ==================== LEADER OPERATIONS ====================

    /// List adult leaders with person/family loaded, filtered and paged.
    /// `ypt_status` filters on date-derived buckets against `today`.
    #[allow(clippy::too_many_arguments)]
    pub async fn list_leaders(
        &self,
        ypt_status: Option<&str>,
        search: Option<&str>,
        sort: &SortSpec,
        page: &PageSpec,
        today: NaiveDate,
    ) -> Result<Paginated<LeaderDetail>, AppError> {
        let mut where_sql = String::from("1 = 1");
        match ypt_status {
            Some("expired") => where_sql.push_str(" AND ypt_expiration_date < ?"),
            Some("expiring_soon") => {
                where_sql.push_str(" AND ypt_expiration_date >= ? AND ypt_expiration_date < ?")
            }
            Some("current") => where_sql.push_str(" AND ypt_expiration_date >= ?"),
            Some("unknown") => where_sql.push_str(" AND ypt_expiration_date IS NULL"),
            _ => {}
        }
        if search.is_some() {
            where_sql.push_str(
                " AND person_id IN (SELECT id FROM persons WHERE deleted_at IS NULL AND \
                 (first_name LIKE ? OR last_name LIKE ? OR email LIKE ?))",
            );
        }

        let soon = today + Days::new(30);
        let pattern = search.map(|s| format!("%{}%", s));

        let count_sql = format!("SELECT COUNT(*) FROM adult_leaders WHERE {}", where_sql);
        let count_row = bind_leader_filters(
            sqlx::query(&count_sql),
            ypt_status,
            pattern.as_deref(),
            today,
            soon,
        )
        .fetch_one(&self.pool)
        .await?;
        let total: i64 = count_row.get(0);

        let rows_sql = format!(
            "SELECT {} FROM adult_leaders WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            LEADER_COLS,
            where_sql,
            sort.to_sql()
        );
        let rows = bind_leader_filters(
            sqlx::query(&rows_sql),
            ypt_status,
            pattern.as_deref(),
            today,
            soon,
        )
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            let leader = leader_from_row(row, today);
            let person = self.person_with_family(leader.person_id).await?;
            data.push(LeaderDetail { leader, person });
        }

        Ok(Paginated::new(data, total, page))
    }

    /// Get a leader with its person and family loaded.
    pub async fn get_leader_detail(
        &self,
        id: i64,
        today: NaiveDate,
    ) -> Result<Option<LeaderDetail>, AppError> {
        let sql = format!("SELECT {} FROM adult_leaders WHERE id = ?", LEADER_COLS);
        let Some(row) = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await? else {
            return Ok(None);
        };
        let leader = leader_from_row(&row, today);
        let person = self.person_with_family(leader.person_id).await?;
        Ok(Some(LeaderDetail { leader, person }))
    }

    /// Create an adult leader record for an existing person.
    pub async fn create_leader(
        &self,
        request: &CreateLeaderRequest,
        today: NaiveDate,
    ) -> Result<LeaderDetail, AppError> {
        self.ensure_person_exists(request.person_id).await?;

        let now = Utc::now().to_rfc3339();
        let positions_json = serde_json::to_string(
            request.positions.as_deref().unwrap_or_default(),
        )?;
        let result = sqlx::query(
            "INSERT INTO adult_leaders (person_id, positions, ypt_status, ypt_completion_date, \
             ypt_expiration_date, registration_expiration_date, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request.person_id)
        .bind(&positions_json)
        .bind(request.ypt_status.map(|s| s.as_str()))
        .bind(request.ypt_completion_date)
        .bind(request.ypt_expiration_date)
        .bind(request.registration_expiration_date)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit("adult_leader", id, "created", None).await;

        self.get_leader_detail(id, today)
            .await?
            .ok_or_else(|| AppError::Internal("leader vanished after insert".to_string()))
    }

    /// Partially update an adult leader.
    pub async fn update_leader(
        &self,
        id: i64,
        request: &UpdateLeaderRequest,
        today: NaiveDate,
    ) -> Result<LeaderDetail, AppError> {
        let existing = self
            .get_leader_detail(id, today)
            .await?
            .ok_or_else(|| AppError::not_found("Adult leader", id))?
            .leader;

        if let Some(pid) = request.person_id {
            if pid != existing.person_id {
                self.ensure_person_exists(pid).await?;
            }
        }

        let now = Utc::now().to_rfc3339();
        let person_id = request.person_id.unwrap_or(existing.person_id);
        let positions = request
            .positions
            .clone()
            .unwrap_or_else(|| existing.positions.clone());
        let positions_json = serde_json::to_string(&positions)?;
        let ypt_status = request.ypt_status.or(existing.ypt_status);
        let ypt_completion_date = request
            .ypt_completion_date
            .or(existing.ypt_completion_date);
        let ypt_expiration_date = request
            .ypt_expiration_date
            .or(existing.ypt_expiration_date);
        let registration_expiration_date = request
            .registration_expiration_date
            .or(existing.registration_expiration_date);

        sqlx::query(
            "UPDATE adult_leaders SET person_id = ?, positions = ?, ypt_status = ?, \
             ypt_completion_date = ?, ypt_expiration_date = ?, registration_expiration_date = ?, \
             updated_at = ? WHERE id = ?",
        )
        .bind(person_id)
        .bind(&positions_json)
        .bind(ypt_status.map(|s| s.as_str()))
        .bind(ypt_completion_date)
        .bind(ypt_expiration_date)
        .bind(registration_expiration_date)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.audit("adult_leader", id, "updated", None).await;

        self.get_leader_detail(id, today)
            .await?
            .ok_or_else(|| AppError::not_found("Adult leader", id))
    }

    /// Delete an adult leader record.
    pub async fn delete_leader(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM adult_leaders WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Adult leader", id));
        }

        self.audit("adult_leader", id, "deleted", None).await;
        Ok(())
    }

    /// Leaders whose YPT lapses within `days` of `today`.
    pub async fn expiring_leaders(
        &self,
        days: u32,
        page: &PageSpec,
        today: NaiveDate,
    ) -> Result<Paginated<LeaderDetail>, AppError> {
        let upper = today + Days::new(u64::from(days));

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM adult_leaders WHERE ypt_expiration_date >= ? \
             AND ypt_expiration_date < ?",
        )
        .bind(today)
        .bind(upper)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {} FROM adult_leaders WHERE ypt_expiration_date >= ? \
             AND ypt_expiration_date < ? ORDER BY ypt_expiration_date ASC LIMIT ? OFFSET ?",
            LEADER_COLS
        );
        let rows = sqlx::query(&sql)
            .bind(today)
            .bind(upper)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            let leader = leader_from_row(row, today);
            let person = self.person_with_family(leader.person_id).await?;
            data.push(LeaderDetail { leader, person });
        }

        Ok(Paginated::new(data, total, page))
    }

    /// Append a position string if not already present.
    pub async fn add_position(
        &self,
        id: i64,
        position: &str,
        today: NaiveDate,
    ) -> Result<LeaderDetail, AppError> {
        let existing = self
            .get_leader_detail(id, today)
            .await?
            .ok_or_else(|| AppError::not_found("Adult leader", id))?
            .leader;

        let mut positions = existing.positions;
        if !positions.iter().any(|p| p == position) {
            positions.push(position.to_string());
            self.store_positions(id, &positions).await?;
        }

        self.get_leader_detail(id, today)
            .await?
            .ok_or_else(|| AppError::not_found("Adult leader", id))
    }

    /// Remove every occurrence of a position string.
    pub async fn remove_position(
        &self,
        id: i64,
        position: &str,
        today: NaiveDate,
    ) -> Result<LeaderDetail, AppError> {
        let existing = self
            .get_leader_detail(id, today)
            .await?
            .ok_or_else(|| AppError::not_found("Adult leader", id))?
            .leader;

        let positions: Vec<String> = existing
            .positions
            .into_iter()
            .filter(|p| p != position)
            .collect();
        self.store_positions(id, &positions).await?;

        self.get_leader_detail(id, today)
            .await?
            .ok_or_else(|| AppError::not_found("Adult leader", id))
    }

    async fn store_positions(&self, id: i64, positions: &[String]) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let positions_json = serde_json::to_string(positions)?;
        sqlx::query("UPDATE adult_leaders SET positions = ?, updated_at = ? WHERE id = ?")
            .bind(&positions_json)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.audit("adult_leader", id, "updated", None).await;
        Ok(())
    }

    // ==================== PERMISSION OPERATIONS ====================

    /// List permissions with person and grantor loaded, filtered and paged.
    pub async fn list_permissions(
        &self,
        role: Option<Role>,
        search: Option<&str>,
        sort: &SortSpec,
        page: &PageSpec,
    ) -> Result<Paginated<PermissionDetail>, AppError> {
        let mut where_sql = String::from("1 = 1");
        if role.is_some() {
            where_sql.push_str(" AND role = ?");
        }
        if search.is_some() {
            where_sql.push_str(
                " AND person_id IN (SELECT id FROM persons WHERE deleted_at IS NULL AND \
                 (first_name LIKE ? OR last_name LIKE ? OR email LIKE ?))",
            );
        }

        let pattern = search.map(|s| format!("%{}%", s));

        let count_sql = format!("SELECT COUNT(*) FROM user_permissions WHERE {}", where_sql);
        let count_row = bind_permission_filters(sqlx::query(&count_sql), role, pattern.as_deref())
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = count_row.get(0);

        let rows_sql = format!(
            "SELECT {} FROM user_permissions WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            PERMISSION_COLS,
            where_sql,
            sort.to_sql()
        );
        let rows = bind_permission_filters(sqlx::query(&rows_sql), role, pattern.as_deref())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            let permission = permission_from_row(row)?;
            data.push(self.load_permission_relations(permission).await?);
        }

        Ok(Paginated::new(data, total, page))
    }

    /// Get a permission by id, without relations.
    pub async fn get_permission(&self, id: i64) -> Result<Option<UserPermission>, AppError> {
        let sql = format!(
            "SELECT {} FROM user_permissions WHERE id = ?",
            PERMISSION_COLS
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(permission_from_row).transpose()
    }

    /// Get a permission with person and grantor loaded.
    pub async fn get_permission_detail(
        &self,
        id: i64,
    ) -> Result<Option<PermissionDetail>, AppError> {
        match self.get_permission(id).await? {
            Some(permission) => Ok(Some(self.load_permission_relations(permission).await?)),
            None => Ok(None),
        }
    }

    /// Create a permission, enforcing wordpress_user_id uniqueness and
    /// the referenced person/grantor.
    pub async fn create_permission(
        &self,
        request: &CreatePermissionRequest,
    ) -> Result<PermissionDetail, AppError> {
        let taken: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_permissions WHERE wordpress_user_id = ?",
        )
        .bind(request.wordpress_user_id)
        .fetch_one(&self.pool)
        .await?;
        if taken > 0 {
            let mut fields = BTreeMap::new();
            fields.insert(
                "wordpress_user_id".to_string(),
                "has already been taken".to_string(),
            );
            return Err(AppError::validation_fields("validation failed", fields));
        }

        self.ensure_person_exists(request.person_id).await?;
        if let Some(granted_by) = request.granted_by {
            if self.get_permission(granted_by).await?.is_none() {
                let mut fields = BTreeMap::new();
                fields.insert(
                    "granted_by".to_string(),
                    "permission does not exist".to_string(),
                );
                return Err(AppError::validation_fields("validation failed", fields));
            }
        }

        let now = Utc::now().to_rfc3339();
        let granted_at = request.granted_at.clone().unwrap_or_else(|| now.clone());

        let result = sqlx::query(
            "INSERT INTO user_permissions (wordpress_user_id, person_id, role, granted_by, \
             granted_at, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request.wordpress_user_id)
        .bind(request.person_id)
        .bind(request.role.as_str())
        .bind(request.granted_by)
        .bind(&granted_at)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.audit("user_permission", id, "created", None).await;

        self.get_permission_detail(id)
            .await?
            .ok_or_else(|| AppError::Internal("permission vanished after insert".to_string()))
    }

    /// Partially update a permission. Changing `granted_by` re-checks the
    /// chain for cycles.
    pub async fn update_permission(
        &self,
        id: i64,
        request: &UpdatePermissionRequest,
    ) -> Result<PermissionDetail, AppError> {
        let existing = self
            .get_permission(id)
            .await?
            .ok_or_else(|| AppError::not_found("Permission", id))?;

        let granted_by = match request.granted_by {
            Some(Some(granted_by)) => {
                if self.get_permission(granted_by).await?.is_none() {
                    let mut fields = BTreeMap::new();
                    fields.insert(
                        "granted_by".to_string(),
                        "permission does not exist".to_string(),
                    );
                    return Err(AppError::validation_fields("validation failed", fields));
                }
                self.ensure_grant_chain_acyclic(id, granted_by).await?;
                Some(granted_by)
            }
            // Explicit null clears the grantor
            Some(None) => None,
            None => existing.granted_by,
        };

        let now = Utc::now().to_rfc3339();
        let role = request.role.unwrap_or(existing.role);
        let granted_at = request
            .granted_at
            .clone()
            .unwrap_or_else(|| existing.granted_at.clone());

        sqlx::query(
            "UPDATE user_permissions SET role = ?, granted_by = ?, granted_at = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(role.as_str())
        .bind(granted_by)
        .bind(&granted_at)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.audit("user_permission", id, "updated", None).await;

        self.get_permission_detail(id)
            .await?
            .ok_or_else(|| AppError::not_found("Permission", id))
    }

    /// Delete a permission.
    pub async fn delete_permission(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM user_permissions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Permission", id));
        }

        self.audit("user_permission", id, "deleted", None).await;
        Ok(())
    }

    /// Permissions holding one role, newest grant first.
    pub async fn permissions_by_role(
        &self,
        role: Role,
        page: &PageSpec,
    ) -> Result<Paginated<PermissionDetail>, AppError> {
        let sort = SortSpec {
            column: "created_at",
            descending: true,
        };
        self.list_permissions(Some(role), None, &sort, page).await
    }

    /// Look up the permission mapped to a WordPress user.
    pub async fn permission_by_wordpress_user(
        &self,
        wordpress_user_id: i64,
    ) -> Result<Option<PermissionDetail>, AppError> {
        let sql = format!(
            "SELECT {} FROM user_permissions WHERE wordpress_user_id = ?",
            PERMISSION_COLS
        );
        let row = sqlx::query(&sql)
            .bind(wordpress_user_id)
            .fetch_optional(&self.pool)
            .await?;
        match row.as_ref().map(permission_from_row).transpose()? {
            Some(permission) => Ok(Some(self.load_permission_relations(permission).await?)),
            None => Ok(None),
        }
    }

    /// All admin permissions, newest first.
    pub async fn admin_permissions(&self) -> Result<Vec<PermissionDetail>, AppError> {
        let sql = format!(
            "SELECT {} FROM user_permissions WHERE role = 'admin' ORDER BY created_at DESC",
            PERMISSION_COLS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            let permission = permission_from_row(row)?;
            data.push(self.load_permission_relations(permission).await?);
        }
        Ok(data)
    }

    async fn load_permission_relations(
        &self,
        permission: UserPermission,
    ) -> Result<PermissionDetail, AppError> {
        let person = match permission.person_id {
            Some(pid) => self.person_with_family(pid).await?,
            None => None,
        };
        let granted_by_permission = match permission.granted_by {
            Some(gid) => self.get_permission(gid).await?.map(Box::new),
            None => None,
        };
        Ok(PermissionDetail {
            permission,
            person,
            granted_by_permission,
        })
    }

    /// Walk the granted_by chain starting at `granted_by`; reaching
    /// `permission_id` again means the write would close a cycle.
    async fn ensure_grant_chain_acyclic(
        &self,
        permission_id: i64,
        granted_by: i64,
    ) -> Result<(), AppError> {
        let mut cursor = Some(granted_by);
        let mut hops = 0u32;
        while let Some(current) = cursor {
            if current == permission_id {
                return Err(AppError::validation(
                    "granted_by chain must not form a cycle",
                ));
            }
            hops += 1;
            if hops > 10_000 {
                return Err(AppError::validation("granted_by chain is too deep"));
            }
            cursor = sqlx::query_scalar::<_, Option<i64>>(
                "SELECT granted_by FROM user_permissions WHERE id = ?",
            )
            .bind(current)
            .fetch_optional(&self.pool)
            .await?
            .flatten();
        }
        Ok(())
    }

    // ==================== DASHBOARD OPERATIONS ====================

    /// Count blocks for the dashboard landing page.
    pub async fn statistics(&self, today: NaiveDate) -> Result<DashboardStatistics, AppError> {
        let soon = today + Days::new(30);

        let families_total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM families")
            .fetch_one(&self.pool)
            .await?;
        let families_active: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM families WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        let persons_total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM persons WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        let count_type = |ty: &'static str| {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM persons WHERE deleted_at IS NULL AND person_type = ?",
            )
            .bind(ty)
            .fetch_one(&self.pool)
        };
        let persons_scouts = count_type("scout").await?;
        let persons_parents = count_type("parent").await?;
        let persons_siblings = count_type("sibling").await?;
        let persons_leaders = count_type("adult_leader").await?;
        let persons_orphaned: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM persons WHERE deleted_at IS NULL AND family_id IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        let scouts_total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scouts")
            .fetch_one(&self.pool)
            .await?;
        let scouts_active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM scouts WHERE registration_status = 'active' \
             AND registration_expiration_date > ?",
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        let scouts_expiring: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM scouts WHERE registration_status = 'active' \
             AND registration_expiration_date >= ? AND registration_expiration_date < ?",
        )
        .bind(today)
        .bind(soon)
        .fetch_one(&self.pool)
        .await?;
        let scouts_expired: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM scouts WHERE registration_expiration_date < ?",
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        let leaders_total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM adult_leaders")
            .fetch_one(&self.pool)
            .await?;
        let ypt_current: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM adult_leaders WHERE ypt_expiration_date >= ?",
        )
        .bind(soon)
        .fetch_one(&self.pool)
        .await?;
        let ypt_expiring: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM adult_leaders WHERE ypt_expiration_date >= ? \
             AND ypt_expiration_date < ?",
        )
        .bind(today)
        .bind(soon)
        .fetch_one(&self.pool)
        .await?;
        let ypt_expired: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM adult_leaders WHERE ypt_expiration_date < ?",
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        let ypt_unknown: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM adult_leaders WHERE ypt_expiration_date IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStatistics {
            families: FamilyCounts {
                total: families_total,
                active: families_active,
            },
            persons: PersonCounts {
                total: persons_total,
                scouts: persons_scouts,
                parents: persons_parents,
                siblings: persons_siblings,
                leaders: persons_leaders,
                orphaned: persons_orphaned,
            },
            scouts: ScoutCounts {
                total: scouts_total,
                active: scouts_active,
                expiring_soon: scouts_expiring,
                expired: scouts_expired,
            },
            leaders: LeaderCounts {
                total: leaders_total,
                ypt_current,
                ypt_expiring_soon: ypt_expiring,
                ypt_expired,
                ypt_unknown,
            },
        })
    }

    /// Most recent audit entries, newest first.
    pub async fn recent_activity(&self, limit: u32) -> Result<Vec<AuditLog>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, entity_type, entity_id, action, changes, created_at \
             FROM audit_logs ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(audit_log_from_row).collect())
    }

    /// Scouts and leaders lapsing within a window.
    pub async fn expiring_records(
        &self,
        days: u32,
        today: NaiveDate,
    ) -> Result<ExpiringRecords, AppError> {
        let upper = today + Days::new(u64::from(days));

        let scout_sql = format!(
            "SELECT {} FROM scouts WHERE registration_status = 'active' \
             AND registration_expiration_date >= ? AND registration_expiration_date < ? \
             ORDER BY registration_expiration_date ASC",
            SCOUT_COLS
        );
        let scout_rows = sqlx::query(&scout_sql)
            .bind(today)
            .bind(upper)
            .fetch_all(&self.pool)
            .await?;
        let mut scouts = Vec::with_capacity(scout_rows.len());
        for row in &scout_rows {
            let scout = scout_from_row(row, today);
            let person = self.person_with_family(scout.person_id).await?;
            scouts.push(ScoutDetail { scout, person });
        }

        let leader_sql = format!(
            "SELECT {} FROM adult_leaders WHERE ypt_expiration_date >= ? \
             AND ypt_expiration_date < ? ORDER BY ypt_expiration_date ASC",
            LEADER_COLS
        );
        let leader_rows = sqlx::query(&leader_sql)
            .bind(today)
            .bind(upper)
            .fetch_all(&self.pool)
            .await?;
        let mut leaders = Vec::with_capacity(leader_rows.len());
        for row in &leader_rows {
            let leader = leader_from_row(row, today);
            let person = self.person_with_family(leader.person_id).await?;
            leaders.push(LeaderDetail { leader, person });
        }

        Ok(ExpiringRecords { scouts, leaders })
    }

    /// Latest sync run per external source.
    pub async fn sync_status(&self) -> Result<SyncStatus, AppError> {
        Ok(SyncStatus {
            scoutbook: self.latest_sync("scoutbook").await?,
            mailchimp: self.latest_sync("mailchimp_import").await?,
        })
    }

    async fn latest_sync(&self, sync_type: &str) -> Result<Option<SyncLog>, AppError> {
        let sql = format!(
            "SELECT {} FROM sync_logs WHERE sync_type = ? ORDER BY created_at DESC, id DESC LIMIT 1",
            SYNC_COLS
        );
        let row = sqlx::query(&sql)
            .bind(sync_type)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(sync_log_from_row))
    }

    /// Sync runs, optionally filtered by type, newest first.
    pub async fn sync_history(
        &self,
        sync_type: Option<&str>,
        limit: u32,
    ) -> Result<Vec<SyncLog>, AppError> {
        let mut where_sql = String::from("1 = 1");
        if sync_type.is_some() {
            where_sql.push_str(" AND sync_type = ?");
        }
        let sql = format!(
            "SELECT {} FROM sync_logs WHERE {} ORDER BY created_at DESC, id DESC LIMIT ?",
            SYNC_COLS, where_sql
        );
        let mut query = sqlx::query(&sql);
        if let Some(ty) = sync_type {
            query = query.bind(ty);
        }
        let rows = query
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(sync_log_from_row).collect())
    }

    /// Append a sync log entry.
    pub async fn record_sync_log(&self, request: &RecordSyncRequest) -> Result<SyncLog, AppError> {
        let now = Utc::now().to_rfc3339();
        let errors_json = request
            .errors
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            "INSERT INTO sync_logs (sync_type, status, started_at, completed_at, \
             records_processed, records_created, records_updated, records_skipped, errors, \
             triggered_by, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.sync_type)
        .bind(&request.status)
        .bind(&request.started_at)
        .bind(&request.completed_at)
        .bind(request.records_processed)
        .bind(request.records_created)
        .bind(request.records_updated)
        .bind(request.records_skipped)
        .bind(&errors_json)
        .bind(request.triggered_by)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        let sql = format!("SELECT {} FROM sync_logs WHERE id = ?", SYNC_COLS);
        let row = sqlx::query(&sql).bind(id).fetch_one(&self.pool).await?;
        Ok(sync_log_from_row(&row))
    }

    /// A family plus per-type member counts.
    pub async fn family_members_report(
        &self,
        family_id: i64,
    ) -> Result<Option<FamilyMembersReport>, AppError> {
        let Some(family) = self.get_family_detail(family_id).await? else {
            return Ok(None);
        };
        let summary = FamilySummary {
            total_members: family.persons.len(),
            scouts: family.scouts.len(),
            parents: family.parents.len(),
            siblings: family.siblings.len(),
            leaders: family.leaders.len(),
        };
        Ok(Some(FamilyMembersReport { family, summary }))
    }

    /// Active-scout head count per den.
    pub async fn den_membership(&self) -> Result<Vec<DenCount>, AppError> {
        let rows = sqlx::query(
            "SELECT den, SUM(CASE WHEN registration_status = 'active' THEN 1 ELSE 0 END) AS count \
             FROM scouts GROUP BY den ORDER BY den",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| DenCount {
                den: row.get("den"),
                count: row.get("count"),
            })
            .collect())
    }

    /// Active-scout head count per rank.
    pub async fn rank_distribution(&self) -> Result<Vec<RankCount>, AppError> {
        let rows = sqlx::query(
            "SELECT rank, SUM(CASE WHEN registration_status = 'active' THEN 1 ELSE 0 END) AS count \
             FROM scouts GROUP BY rank ORDER BY rank",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| RankCount {
                rank: row.get("rank"),
                count: row.get("count"),
            })
            .collect())
    }

    // ==================== SETTINGS ====================

    /// Look up a setting by key.
    pub async fn get_setting(&self, key: &str) -> Result<Option<Setting>, AppError> {
        let row = sqlx::query(
            "SELECT setting_key, setting_value, updated_at FROM settings WHERE setting_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| Setting {
            setting_key: row.get("setting_key"),
            setting_value: row.get("setting_value"),
            updated_at: row.get("updated_at"),
        }))
    }

    /// Insert or update a setting.
    pub async fn set_setting(
        &self,
        key: &str,
        value: Option<&str>,
    ) -> Result<Setting, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO settings (setting_key, setting_value, created_at, updated_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(setting_key) DO UPDATE SET setting_value = excluded.setting_value, \
             updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_setting(key)
            .await?
            .ok_or_else(|| AppError::Internal("setting vanished after upsert".to_string()))
    }

    // ==================== AUDIT ====================

    /// Append an audit entry. Failures are logged, never propagated:
    /// the trail is ancillary to the mutation it records.
    async fn audit(
        &self,
        entity_type: &str,
        entity_id: i64,
        action: &str,
        changes: Option<serde_json::Value>,
    ) {
        let now = Utc::now().to_rfc3339();
        let changes_json = changes.map(|c| c.to_string());
        let result = sqlx::query(
            "INSERT INTO audit_logs (entity_type, entity_id, action, changes, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(entity_type)
        .bind(entity_id)
        .bind(action)
        .bind(&changes_json)
        .bind(&now)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to write audit log for {} {}: {}", entity_type, entity_id, e);
        }
    }
}

/// Audit write inside an open transaction; merge audit commits with the
/// merge itself.
async fn record_audit_tx(
    tx: &mut Transaction<'_, Sqlite>,
    entity_type: &str,
    entity_id: i64,
    action: &str,
    changes: Option<serde_json::Value>,
) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();
    let changes_json = changes.map(|c| c.to_string());
    sqlx::query(
        "INSERT INTO audit_logs (entity_type, entity_id, action, changes, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(entity_type)
    .bind(entity_id)
    .bind(action)
    .bind(&changes_json)
    .bind(&now)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// Filter binding helpers; the bind order mirrors the order the WHERE
// fragments are appended in the list methods above.

fn bind_person_filters<'q>(
    mut q: SqliteQuery<'q>,
    family_id: Option<i64>,
    person_type: Option<PersonType>,
    pattern: Option<&'q str>,
) -> SqliteQuery<'q> {
    if let Some(fid) = family_id {
        q = q.bind(fid);
    }
    if let Some(pt) = person_type {
        q = q.bind(pt.as_str());
    }
    if let Some(p) = pattern {
        q = q.bind(p).bind(p).bind(p).bind(p);
    }
    q
}

fn bind_scout_filters<'q>(
    mut q: SqliteQuery<'q>,
    den: Option<&'q str>,
    rank: Option<&'q str>,
    status: Option<&str>,
    pattern: Option<&'q str>,
    today: NaiveDate,
    soon: NaiveDate,
) -> SqliteQuery<'q> {
    if let Some(d) = den {
        q = q.bind(d);
    }
    if let Some(r) = rank {
        q = q.bind(r);
    }
    match status {
        Some("active") | Some("expired") => q = q.bind(today),
        Some("expiring_soon") => q = q.bind(today).bind(soon),
        _ => {}
    }
    if let Some(p) = pattern {
        q = q.bind(p).bind(p).bind(p);
    }
    q
}

fn bind_leader_filters<'q>(
    mut q: SqliteQuery<'q>,
    ypt_status: Option<&str>,
    pattern: Option<&'q str>,
    today: NaiveDate,
    soon: NaiveDate,
) -> SqliteQuery<'q> {
    match ypt_status {
        Some("expired") => q = q.bind(today),
        Some("expiring_soon") => q = q.bind(today).bind(soon),
        Some("current") => q = q.bind(soon),
        _ => {}
    }
    if let Some(p) = pattern {
        q = q.bind(p).bind(p).bind(p);
    }
    q
}

fn bind_permission_filters<'q>(
    mut q: SqliteQuery<'q>,
    role: Option<Role>,
    pattern: Option<&'q str>,
) -> SqliteQuery<'q> {
    if let Some(r) = role {
        q = q.bind(r.as_str());
    }
    if let Some(p) = pattern {
        q = q.bind(p).bind(p).bind(p);
    }
    q
}

// Helper functions for row conversion

fn family_from_row(row: &sqlx::sqlite::SqliteRow) -> Family {
    Family {
        id: row.get("id"),
        name: row.get("name"),
        street_address: row.get("street_address"),
        city: row.get("city"),
        state: row.get("state"),
        zip: row.get("zip"),
        primary_phone: row.get("primary_phone"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

fn person_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Person, AppError> {
    let type_str: String = row.get("person_type");
    let person_type = PersonType::from_str(&type_str)
        .ok_or_else(|| AppError::Internal(format!("invalid person_type '{}'", type_str)))?;
    let gender: Option<String> = row.get("gender");

    Ok(Person {
        id: row.get("id"),
        family_id: row.get("family_id"),
        bsa_member_id: row.get("bsa_member_id"),
        person_type,
        prefix: row.get("prefix"),
        first_name: row.get("first_name"),
        middle_name: row.get("middle_name"),
        last_name: row.get("last_name"),
        suffix: row.get("suffix"),
        nickname: row.get("nickname"),
        gender: gender.as_deref().and_then(Gender::from_str),
        date_of_birth: row.get("date_of_birth"),
        age: row.get("age"),
        email: row.get("email"),
        phone: row.get("phone"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    })
}

fn scout_from_row(row: &sqlx::sqlite::SqliteRow, today: NaiveDate) -> Scout {
    let expiration: Option<NaiveDate> = row.get("registration_expiration_date");
    let registration_status: Option<String> = row.get("registration_status");
    let ypt_status: Option<String> = row.get("ypt_status");
    let days = days_until(expiration, today);

    Scout {
        id: row.get("id"),
        person_id: row.get("person_id"),
        grade: row.get("grade"),
        rank: row.get("rank"),
        den: row.get("den"),
        registration_expiration_date: expiration,
        registration_status: registration_status
            .as_deref()
            .and_then(RegistrationState::from_str),
        ypt_status: ypt_status.as_deref().and_then(YptTraining::from_str),
        program: row.get("program"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        days_until_expiration: days,
        expiration_status: ExpirationStatus::classify(days),
    }
}

fn leader_from_row(row: &sqlx::sqlite::SqliteRow, today: NaiveDate) -> AdultLeader {
    let positions_str: Option<String> = row.get("positions");
    let ypt_status: Option<String> = row.get("ypt_status");
    let ypt_expiration: Option<NaiveDate> = row.get("ypt_expiration_date");
    let days = days_until(ypt_expiration, today);

    AdultLeader {
        id: row.get("id"),
        person_id: row.get("person_id"),
        positions: positions_str
            .as_deref()
            .map(parse_json_array)
            .unwrap_or_default(),
        ypt_status: ypt_status.as_deref().and_then(YptTraining::from_str),
        ypt_completion_date: row.get("ypt_completion_date"),
        ypt_expiration_date: ypt_expiration,
        registration_expiration_date: row.get("registration_expiration_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        days_until_ypt_expiration: days,
        ypt_status_formatted: YptStatus::classify(days),
    }
}

fn permission_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<UserPermission, AppError> {
    let role_str: String = row.get("role");
    let role = Role::from_str(&role_str)
        .ok_or_else(|| AppError::Internal(format!("invalid role '{}'", role_str)))?;

    Ok(UserPermission {
        id: row.get("id"),
        wordpress_user_id: row.get("wordpress_user_id"),
        person_id: row.get("person_id"),
        role,
        granted_by: row.get("granted_by"),
        granted_at: row.get("granted_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn sync_log_from_row(row: &sqlx::sqlite::SqliteRow) -> SyncLog {
    let errors_str: Option<String> = row.get("errors");
    SyncLog {
        id: row.get("id"),
        sync_type: row.get("sync_type"),
        status: row.get("status"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        records_processed: row.get("records_processed"),
        records_created: row.get("records_created"),
        records_updated: row.get("records_updated"),
        records_skipped: row.get("records_skipped"),
        errors: errors_str.as_deref().map(parse_json_array),
        triggered_by: row.get("triggered_by"),
        created_at: row.get("created_at"),
    }
}

fn audit_log_from_row(row: &sqlx::sqlite::SqliteRow) -> AuditLog {
    let changes_str: Option<String> = row.get("changes");
    AuditLog {
        id: row.get("id"),
        user_id: row.get("user_id"),
        entity_type: row.get("entity_type"),
        entity_id: row.get("entity_id"),
        action: row.get("action"),
        changes: changes_str.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: row.get("created_at"),
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn group_family_members(family: Family, members: Vec<Person>) -> FamilyDetail {
    let of_type = |ty: PersonType| -> Vec<Person> {
        members
            .iter()
            .filter(|p| p.person_type == ty)
            .cloned()
            .collect()
    };
    let scouts = of_type(PersonType::Scout);
    let parents = of_type(PersonType::Parent);
    let siblings = of_type(PersonType::Sibling);
    let leaders = of_type(PersonType::AdultLeader);

    FamilyDetail {
        family,
        persons: members,
        scouts,
        parents,
        siblings,
        leaders,
    }
}
