use super::parsing::{
    env_flag, env_optional, env_or_default, is_bucket_name, parse_bool, parse_cors_origins,
    parse_environment, parse_string_list, parse_u16, parse_u64,
};
use super::types::{
    ApiSettings, AuthSettings, ConfigError, CorsSettings, DatabaseSettings, DemoSettings,
    IdentitySettings, RedisSettings, RuntimeSettings, S3Settings, ServerHost, ServerPort,
    ServerSettings, SessionSettings, Settings, StorageSettings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("EXAMVERSE_HOST", "0.0.0.0");
        let port = env_or_default("EXAMVERSE_PORT", "8000");

        let environment = parse_environment(
            env_optional("EXAMVERSE_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config =
            env_flag("EXAMVERSE_STRICT_CONFIG").unwrap_or(false) || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "ExamVerse API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "postgres");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "examverse");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let identity_url = env_or_default("IDENTITY_URL", "http://localhost:54321");
        let identity_anon_key = env_or_default("IDENTITY_ANON_KEY", "");
        let identity_jwt_secret = env_or_default("IDENTITY_JWT_SECRET", "");
        let identity_timeout_seconds = parse_u64(
            "IDENTITY_TIMEOUT_SECONDS",
            env_or_default("IDENTITY_TIMEOUT_SECONDS", "15"),
        )?;

        let settle_timeout_ms = parse_u64(
            "SESSION_SETTLE_TIMEOUT_MS",
            env_or_default("SESSION_SETTLE_TIMEOUT_MS", "5000"),
        )?;
        let idle_timeout_seconds = parse_u64(
            "SESSION_IDLE_TIMEOUT_SECONDS",
            env_or_default("SESSION_IDLE_TIMEOUT_SECONDS", "1800"),
        )?;
        let sweep_interval_seconds = parse_u64(
            "SESSION_SWEEP_INTERVAL_SECONDS",
            env_or_default("SESSION_SWEEP_INTERVAL_SECONDS", "60"),
        )?;

        let s3_endpoint = env_or_default("S3_ENDPOINT", "http://localhost:54321/storage/v1/s3");
        let s3_access_key = env_or_default("S3_ACCESS_KEY", "");
        let s3_secret_key = env_or_default("S3_SECRET_KEY", "");
        let s3_region = env_or_default("S3_REGION", "local");

        let storage_public_url =
            env_or_default("STORAGE_PUBLIC_URL", "http://localhost:54321/storage/v1/object/public");
        let exam_papers_bucket = env_or_default("EXAM_PAPERS_BUCKET", "exam_papers");
        let submissions_bucket = env_or_default("SUBMISSIONS_BUCKET", "submissions");
        let max_upload_size_mb =
            parse_u64("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "20"))?;
        let allowed_upload_extensions = parse_string_list(
            env_optional("ALLOWED_UPLOAD_EXTENSIONS"),
            &["pdf", "doc", "docx", "png", "jpg", "jpeg"],
        );
        let signed_url_expire_seconds = parse_u64(
            "SIGNED_URL_EXPIRE_SECONDS",
            env_or_default("SIGNED_URL_EXPIRE_SECONDS", "3600"),
        )?;
        let cache_control_seconds = parse_u64(
            "STORAGE_CACHE_CONTROL_SECONDS",
            env_or_default("STORAGE_CACHE_CONTROL_SECONDS", "3600"),
        )?;

        let auth_rate_limit =
            parse_u64("AUTH_RATE_LIMIT", env_or_default("AUTH_RATE_LIMIT", "10"))?;
        let auth_rate_window_seconds = parse_u64(
            "AUTH_RATE_WINDOW_SECONDS",
            env_or_default("AUTH_RATE_WINDOW_SECONDS", "60"),
        )?;

        let demo_seed_enabled = env_optional("DEMO_SEED_ENABLED")
            .map(|value| parse_bool(&value))
            .unwrap_or(!environment.is_production());

        let log_level = env_or_default("EXAMVERSE_LOG_LEVEL", "info");
        let json = env_flag("EXAMVERSE_LOG_JSON").unwrap_or(false);
        let prometheus_enabled = env_flag("PROMETHEUS_ENABLED").unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            identity: IdentitySettings {
                url: identity_url,
                anon_key: identity_anon_key,
                jwt_secret: identity_jwt_secret,
                timeout_seconds: identity_timeout_seconds,
            },
            session: SessionSettings {
                settle_timeout_ms,
                idle_timeout_seconds,
                sweep_interval_seconds,
            },
            storage: StorageSettings {
                public_url: storage_public_url,
                exam_papers_bucket,
                submissions_bucket,
                max_upload_size_mb,
                allowed_upload_extensions,
                signed_url_expire_seconds,
                cache_control_seconds,
            },
            s3: S3Settings {
                endpoint: s3_endpoint,
                access_key: s3_access_key,
                secret_key: s3_secret_key,
                region: s3_region,
            },
            auth: AuthSettings {
                rate_limit: auth_rate_limit,
                rate_window_seconds: auth_rate_window_seconds,
            },
            demo: DemoSettings { seed_enabled: demo_seed_enabled },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn identity(&self) -> &IdentitySettings {
        &self.identity
    }

    pub(crate) fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn s3(&self) -> &S3Settings {
        &self.s3
    }

    pub(crate) fn auth(&self) -> &AuthSettings {
        &self.auth
    }

    pub(crate) fn demo(&self) -> &DemoSettings {
        &self.demo
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.allowed_upload_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_UPLOAD_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }

        for (field, bucket) in [
            ("EXAM_PAPERS_BUCKET", &self.storage.exam_papers_bucket),
            ("SUBMISSIONS_BUCKET", &self.storage.submissions_bucket),
        ] {
            if !is_bucket_name(bucket) {
                return Err(ConfigError::InvalidValue { field, value: bucket.clone() });
            }
        }

        if self.storage.exam_papers_bucket == self.storage.submissions_bucket {
            return Err(ConfigError::InvalidValue {
                field: "SUBMISSIONS_BUCKET",
                value: self.storage.submissions_bucket.clone(),
            });
        }

        if self.storage.signed_url_expire_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SIGNED_URL_EXPIRE_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.session.settle_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SESSION_SETTLE_TIMEOUT_MS",
                value: "0".to_string(),
            });
        }

        if self.session.idle_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SESSION_IDLE_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.session.sweep_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SESSION_SWEEP_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.demo.seed_enabled && self.runtime.environment.is_production() {
            return Err(ConfigError::InvalidValue {
                field: "DEMO_SEED_ENABLED",
                value: "true".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.identity.anon_key.is_empty() {
            return Err(ConfigError::MissingSecret("IDENTITY_ANON_KEY"));
        }
        if self.identity.jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecret("IDENTITY_JWT_SECRET"));
        }
        if !self.s3.is_configured() {
            return Err(ConfigError::MissingSecret("S3_ACCESS_KEY/S3_SECRET_KEY"));
        }

        Ok(())
    }
}
