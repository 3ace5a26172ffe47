use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    pub jwt_secret: String,

    // Web Push signing material (base64url-encoded P-256 keys)
    pub vapid_public_key: String,
    pub vapid_private_key: String,
    pub vapid_subject: String,

    // Shared secret for the external cron trigger; empty disables the endpoint
    pub cron_secret: String,

    // In-process reminder sweep for deployments without an external cron.
    // Do not enable alongside an external cron — the match window equals the
    // sweep interval, so two trigger sources produce duplicate reminders.
    pub reminder_worker_enabled: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),

            vapid_public_key: env::var("VAPID_PUBLIC_KEY").unwrap_or_else(|_| String::new()),
            vapid_private_key: env::var("VAPID_PRIVATE_KEY").unwrap_or_else(|_| String::new()),
            vapid_subject: env::var("VAPID_SUBJECT")
                .unwrap_or_else(|_| "mailto:admin@liftlog.app".into()),

            cron_secret: env::var("CRON_SECRET").unwrap_or_else(|_| String::new()),

            reminder_worker_enabled: env::var("REMINDER_WORKER_ENABLED")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
