use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub texts: TextsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AssistantConfig {
    /// Persona/style instruction seeded as the first history entry.
    pub system_prompt: String,
    /// Fixed acknowledgment seeded as the second history entry.
    #[serde(default = "AssistantConfig::default_acknowledgment")]
    pub acknowledgment: String,
    #[serde(default = "AssistantConfig::default_model")]
    pub model: String,
    #[serde(default = "AssistantConfig::default_temperature")]
    pub temperature: f32,
    #[serde(default = "AssistantConfig::default_top_k")]
    pub top_k: u32,
    #[serde(default = "AssistantConfig::default_top_p")]
    pub top_p: f32,
    #[serde(default = "AssistantConfig::default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl AssistantConfig {
    fn default_acknowledgment() -> String {
        "تمام، أنا جاهز أساعدك.".to_string()
    }

    fn default_model() -> String {
        "gemini-2.0-flash".to_string()
    }

    const fn default_temperature() -> f32 {
        0.2
    }

    const fn default_top_k() -> u32 {
        20
    }

    const fn default_top_p() -> f32 {
        0.7
    }

    const fn default_max_output_tokens() -> u32 {
        150
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CompletionConfig {
    /// Total attempts before degrading to the apology text.
    #[serde(default = "CompletionConfig::default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff delay; attempt N waits N times this.
    #[serde(default = "CompletionConfig::default_base_delay_secs")]
    pub base_delay_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            base_delay_secs: Self::default_base_delay_secs(),
        }
    }
}

impl CompletionConfig {
    const fn default_max_attempts() -> u32 {
        5
    }

    const fn default_base_delay_secs() -> u64 {
        3
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "SessionConfig::default_timeout_minutes")]
    pub timeout_minutes: i64,
    /// User/model exchange pairs retained beyond the preamble.
    #[serde(default = "SessionConfig::default_max_context_messages")]
    pub max_context_messages: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: Self::default_timeout_minutes(),
            max_context_messages: Self::default_max_context_messages(),
        }
    }
}

impl SessionConfig {
    const fn default_timeout_minutes() -> i64 {
        15
    }

    const fn default_max_context_messages() -> usize {
        5
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GatewayConfig {
    /// Gemini API keys; users are pinned round-robin across these.
    pub api_keys: Vec<String>,
    /// Sender phone numbers allowed to talk to the bot. Empty = no restriction.
    #[serde(default)]
    pub allowed_senders: Vec<String>,
    #[serde(default = "GatewayConfig::default_max_message_chars")]
    pub max_message_chars: usize,
    /// Delay between receipt and dispatch, letting read receipts settle.
    #[serde(default = "GatewayConfig::default_reply_delay_secs")]
    pub reply_delay_secs: u64,
    /// Isolates on-disk transport credentials per deployment.
    #[serde(default = "GatewayConfig::default_deployment_id")]
    pub deployment_id: String,
}

impl GatewayConfig {
    const fn default_max_message_chars() -> usize {
        500
    }

    const fn default_reply_delay_secs() -> u64 {
        5
    }

    fn default_deployment_id() -> String {
        "default".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScheduleConfig {
    /// IANA timezone name the gate evaluates in.
    #[serde(default = "ScheduleConfig::default_timezone")]
    pub timezone: String,
    /// Allowed weekday indices, 0 = Sunday .. 6 = Saturday.
    #[serde(default = "ScheduleConfig::default_weekdays")]
    pub weekdays: Vec<u8>,
    #[serde(default = "ScheduleConfig::default_start_hour")]
    pub start_hour: u32,
    /// Exclusive upper bound.
    #[serde(default = "ScheduleConfig::default_end_hour")]
    pub end_hour: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: Self::default_timezone(),
            weekdays: Self::default_weekdays(),
            start_hour: Self::default_start_hour(),
            end_hour: Self::default_end_hour(),
        }
    }
}

impl ScheduleConfig {
    fn default_timezone() -> String {
        "Asia/Jerusalem".to_string()
    }

    fn default_weekdays() -> Vec<u8> {
        vec![0, 1, 2, 3, 4, 6]
    }

    const fn default_start_hour() -> u32 {
        0
    }

    const fn default_end_hour() -> u32 {
        24
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TextsConfig {
    /// Sent when every retry attempt was exhausted.
    #[serde(default = "TextsConfig::default_apology")]
    pub apology: String,
    /// Sent when the inbound text exceeds the length cap.
    #[serde(default = "TextsConfig::default_too_long")]
    pub too_long: String,
    /// Sent when the completion failed permanently.
    #[serde(default = "TextsConfig::default_technical_error")]
    pub technical_error: String,
}

impl Default for TextsConfig {
    fn default() -> Self {
        Self {
            apology: Self::default_apology(),
            too_long: Self::default_too_long(),
            technical_error: Self::default_technical_error(),
        }
    }
}

impl TextsConfig {
    fn default_apology() -> String {
        "ما قدرت أجاوب هلأ، حاول كمان شوي 🙏".to_string()
    }

    fn default_too_long() -> String {
        "الرسالة طويلة جداً، حاول تبسيط سؤالك لو سمحت 🙏".to_string()
    }

    fn default_technical_error() -> String {
        "صار خطأ تقني أثناء الرد، حاول مرة تانية لو سمحت. 🙏".to_string()
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_dir()?.join("config.json");

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'warelay init' to create config.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// # Errors
    /// Rejects configurations the gateway cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.gateway.api_keys.is_empty() {
            anyhow::bail!("gateway.api_keys must contain at least one credential");
        }
        if self.session.max_context_messages == 0 {
            anyhow::bail!("session.max_context_messages must be at least 1");
        }
        if self.completion.max_attempts == 0 {
            anyhow::bail!("completion.max_attempts must be at least 1");
        }
        if self.schedule.end_hour > 24 || self.schedule.start_hour >= self.schedule.end_hour {
            anyhow::bail!("schedule hours must satisfy start_hour < end_hour <= 24");
        }
        Ok(())
    }

    fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("warelay"))
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    /// Per-deployment directory for the transport's persisted credentials.
    pub fn ensure_auth_dir(deployment_id: &str) -> anyhow::Result<PathBuf> {
        let auth_dir = Self::config_dir()?.join("auth").join(deployment_id);
        std::fs::create_dir_all(&auth_dir)?;
        Ok(auth_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        let config_template = r#"{
  "assistant": {
    "system_prompt": "You are a friendly assistant. Reply briefly and politely in the user's language.",
    "model": "gemini-2.0-flash",
    "temperature": 0.2,
    "top_k": 20,
    "top_p": 0.7,
    "max_output_tokens": 150
  },
  "completion": {
    "max_attempts": 5,
    "base_delay_secs": 3
  },
  "session": {
    "timeout_minutes": 15,
    "max_context_messages": 5
  },
  "gateway": {
    "api_keys": ["your-gemini-api-key-here"],
    "allowed_senders": [],
    "max_message_chars": 500,
    "reply_delay_secs": 5,
    "deployment_id": "default"
  },
  "schedule": {
    "timezone": "Asia/Jerusalem",
    "weekdays": [0, 1, 2, 3, 4, 6],
    "start_hour": 0,
    "end_hour": 24
  }
}"#;

        std::fs::write(&config_path, config_template)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Edit the config file and add your Gemini API key(s)");
        println!("   2. Set allowed_senders to the phone numbers the bot may answer");
        println!("   3. Run 'warelay run' to start the gateway");
        println!();
        println!("🔧 Configuration options:");
        println!("   - assistant.system_prompt: persona seeded into every session");
        println!("   - session.max_context_messages: exchange pairs kept in context");
        println!("   - schedule.weekdays: 0 = Sunday .. 6 = Saturday");
        println!();
        Ok(())
    }
}
