use chrono::{DateTime, Utc};
use log::info;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::error::{AppError, Result};
use crate::model::{
    EngagementResult, FilterOptions, OverallStatus, ResultFilters, SeverityCategory, Student,
    StudentInput, StudentResults,
};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(url: &str) -> Result<Self> {
        // Every connection to sqlite::memory: opens its own database, so keep
        // exactly one alive for the life of the pool
        let options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options.connect(url).await?;

        let db = Database { pool };
        db.migrate().await?;
        info!("Connected to database at {}", url);
        Ok(db)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS students (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                roll_no TEXT NOT NULL UNIQUE,
                subject TEXT NOT NULL,
                section TEXT NOT NULL,
                session TEXT NOT NULL,
                teacher TEXT NOT NULL,
                department TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS engagement_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                roll_no TEXT NOT NULL,
                final_engagement_status TEXT NOT NULL,
                engagement_category TEXT NOT NULL,
                engagement_percentage REAL NOT NULL,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn add_student(&self, input: &StudentInput) -> Result<Student> {
        input.validate()?;
        if self.find_student_by_roll_no(&input.roll_no).await?.is_some() {
            return Err(AppError::Conflict(format!("student with roll number {}", input.roll_no)));
        }

        let id = sqlx::query(
            r#"
            INSERT INTO students (name, roll_no, subject, section, session, teacher, department)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.name)
        .bind(&input.roll_no)
        .bind(&input.subject)
        .bind(&input.section)
        .bind(&input.session)
        .bind(&input.teacher)
        .bind(&input.department)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(student_from_input(id, input))
    }

    pub async fn update_student(&self, id: i64, input: &StudentInput) -> Result<Student> {
        input.validate()?;
        if let Some(existing) = self.find_student_by_roll_no(&input.roll_no).await? {
            if existing.id != id {
                return Err(AppError::Conflict(format!("student with roll number {}", input.roll_no)));
            }
        }

        let affected = sqlx::query(
            r#"
            UPDATE students
            SET name = ?, roll_no = ?, subject = ?, section = ?, session = ?, teacher = ?, department = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.name)
        .bind(&input.roll_no)
        .bind(&input.subject)
        .bind(&input.section)
        .bind(&input.session)
        .bind(&input.teacher)
        .bind(&input.department)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(AppError::NotFound(format!("student {}", id)));
        }
        Ok(student_from_input(id, input))
    }

    pub async fn delete_student(&self, id: i64) -> Result<()> {
        let affected = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(AppError::NotFound(format!("student {}", id)));
        }
        Ok(())
    }

    pub async fn get_students(&self) -> Result<Vec<Student>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, roll_no, subject, section, session, teacher, department
            FROM students
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(student_from_row).collect()
    }

    pub async fn find_student_by_roll_no(&self, roll_no: &str) -> Result<Option<Student>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, roll_no, subject, section, session, teacher, department
            FROM students
            WHERE roll_no = ?
            "#,
        )
        .bind(roll_no)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(student_from_row).transpose()
    }

    pub async fn get_filter_options(&self) -> Result<FilterOptions> {
        Ok(FilterOptions {
            departments: self.distinct_values("department").await?,
            sections: self.distinct_values("section").await?,
            sessions: self.distinct_values("session").await?,
        })
    }

    // column is one of our own fixed names, never user input
    async fn distinct_values(&self, column: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT {col} FROM students WHERE TRIM({col}) != '' ORDER BY {col}",
            col = column
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>(0).map_err(AppError::from))
            .collect()
    }

    pub async fn save_engagement_result(&self, result: &EngagementResult) -> Result<()> {
        if self.find_student_by_roll_no(&result.roll_no).await?.is_none() {
            return Err(AppError::NotFound(format!("student with roll number {}", result.roll_no)));
        }

        sqlx::query(
            r#"
            INSERT INTO engagement_results
                (roll_no, final_engagement_status, engagement_category, engagement_percentage, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&result.roll_no)
        .bind(result.final_engagement_status.as_str())
        .bind(result.engagement_category.as_str())
        .bind(result.engagement_percentage)
        .bind(result.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_results_for(&self, roll_no: &str) -> Result<Vec<EngagementResult>> {
        let rows = sqlx::query(
            r#"
            SELECT roll_no, final_engagement_status, engagement_category, engagement_percentage, created_at
            FROM engagement_results
            WHERE roll_no = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(roll_no)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(result_from_row).collect()
    }

    pub async fn get_student_results(&self, filters: &ResultFilters) -> Result<Vec<StudentResults>> {
        let students = self.get_students().await?;
        let mut out = Vec::new();

        for student in students {
            if !matches_filter(&filters.department, &student.department)
                || !matches_filter(&filters.section, &student.section)
                || !matches_filter(&filters.session, &student.session)
            {
                continue;
            }
            let results = self.get_results_for(&student.roll_no).await?;
            out.push(StudentResults { student, results });
        }

        Ok(out)
    }
}

// An empty filter selects everything
fn matches_filter(filter: &Option<String>, value: &str) -> bool {
    match filter.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(wanted) => wanted == value,
    }
}

fn student_from_input(id: i64, input: &StudentInput) -> Student {
    Student {
        id,
        name: input.name.clone(),
        roll_no: input.roll_no.clone(),
        subject: input.subject.clone(),
        section: input.section.clone(),
        session: input.session.clone(),
        teacher: input.teacher.clone(),
        department: input.department.clone(),
    }
}

fn student_from_row(row: &SqliteRow) -> Result<Student> {
    Ok(Student {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        roll_no: row.try_get("roll_no")?,
        subject: row.try_get("subject")?,
        section: row.try_get("section")?,
        session: row.try_get("session")?,
        teacher: row.try_get("teacher")?,
        department: row.try_get("department")?,
    })
}

fn result_from_row(row: &SqliteRow) -> Result<EngagementResult> {
    let status: String = row.try_get("final_engagement_status")?;
    let category: String = row.try_get("engagement_category")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(EngagementResult {
        roll_no: row.try_get("roll_no")?,
        final_engagement_status: parse_overall_status(&status)?,
        engagement_category: parse_severity(&category)?,
        engagement_percentage: row.try_get("engagement_percentage")?,
        created_at,
    })
}

fn parse_overall_status(value: &str) -> Result<OverallStatus> {
    match value {
        "Engaged" => Ok(OverallStatus::Engaged),
        "Distracted" => Ok(OverallStatus::Distracted),
        other => Err(AppError::Database(sqlx::Error::Decode(
            format!("unknown engagement status {:?}", other).into(),
        ))),
    }
}

fn parse_severity(value: &str) -> Result<SeverityCategory> {
    [
        SeverityCategory::VeryLow,
        SeverityCategory::Low,
        SeverityCategory::Moderate,
        SeverityCategory::High,
        SeverityCategory::VeryHigh,
    ]
    .into_iter()
    .find(|c| c.as_str() == value)
    .ok_or_else(|| {
        AppError::Database(sqlx::Error::Decode(
            format!("unknown engagement category {:?}", value).into(),
        ))
    })
}
