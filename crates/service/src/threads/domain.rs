/// The root Slack message for one pull request.
#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    pub repository: String,
    pub number: i64,
    pub channel: String,
    pub ts: String,
}

impl From<models::pull_request_thread::Model> for Thread {
    fn from(m: models::pull_request_thread::Model) -> Self {
        Self { repository: m.repository, number: m.number, channel: m.slack_channel, ts: m.slack_ts }
    }
}
