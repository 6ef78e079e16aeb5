use serde::Deserialize;

/// A serialized reading event on its way out to the client.
#[derive(actix::Message)]
#[rtype(result = "()")]
pub struct FeedMessage(pub String);

/// Query parameters for the live feed route.
#[derive(Deserialize)]
pub struct WsQuery {
    pub patient_id: String,
    pub token: String,
}
