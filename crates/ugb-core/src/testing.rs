//! Recording fakes for the API and messaging ports (test builds only).

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    domain::{ChatId, Credentials, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::InlineKeyboard},
    purchase::{ApiRequest, ApiResponse, Endpoint, UgPhoneApi},
    Result,
};

#[derive(Clone, Debug)]
pub enum FakeReply {
    Ok(ApiResponse),
    Timeout,
    Broken(&'static str),
}

#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub login_id: String,
    pub endpoint: Endpoint,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
}

/// Endpoint-scripted API. Replies can be overridden per login id.
#[derive(Default)]
pub struct FakeApi {
    replies: Mutex<HashMap<(Option<String>, Endpoint), FakeReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeApi {
    /// Every endpoint answers the way a successful purchase does.
    pub fn happy(order_id: &str) -> Self {
        let api = Self::default();
        api.set(Endpoint::NewPackage, FakeReply::Ok(ApiResponse::ok(json!({ "code": 200 }))));
        api.set(
            Endpoint::ConfigList,
            FakeReply::Ok(ApiResponse::ok(json!({
                "code": 200,
                "data": { "list": [
                    { "config_name": "VIP", "android_version": [ { "config_id": "cfg-0" } ] },
                    { "config_name": "UVIP", "android_version": [ { "config_id": "cfg-1" } ] }
                ] }
            }))),
        );
        api.set(
            Endpoint::MealList,
            FakeReply::Ok(ApiResponse::ok(json!({
                "data": { "list": { "subscription": [ { "network_id": "net-1" } ] } }
            }))),
        );
        api.set(
            Endpoint::QueryResourcePrice,
            FakeReply::Ok(ApiResponse::ok(json!({ "data": { "amount_id": "amt-1" } }))),
        );
        api.set(
            Endpoint::Payment,
            FakeReply::Ok(ApiResponse::ok(json!({ "data": { "order_id": order_id } }))),
        );
        api
    }

    pub fn set(&self, endpoint: Endpoint, reply: FakeReply) {
        self.replies
            .lock()
            .unwrap()
            .insert((None, endpoint), reply);
    }

    pub fn set_for(&self, login_id: &str, endpoint: Endpoint, reply: FakeReply) {
        self.replies
            .lock()
            .unwrap()
            .insert((Some(login_id.to_string()), endpoint), reply);
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.calls.lock().unwrap().iter().map(|c| c.endpoint).collect()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn body_for(&self, endpoint: Endpoint) -> Option<Value> {
        self.last_call(endpoint).and_then(|c| c.body)
    }

    pub fn timeout_for(&self, endpoint: Endpoint) -> Option<Option<Duration>> {
        self.last_call(endpoint).map(|c| c.timeout)
    }

    fn last_call(&self, endpoint: Endpoint) -> Option<RecordedCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.endpoint == endpoint)
            .cloned()
    }
}

#[async_trait]
impl UgPhoneApi for FakeApi {
    async fn call(&self, creds: &Credentials, req: ApiRequest) -> Result<ApiResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            login_id: creds.login_id.clone(),
            endpoint: req.endpoint,
            body: req.body.clone(),
            timeout: req.timeout,
        });

        let reply = {
            let replies = self.replies.lock().unwrap();
            replies
                .get(&(Some(creds.login_id.clone()), req.endpoint))
                .or_else(|| replies.get(&(None, req.endpoint)))
                .cloned()
        };

        match reply {
            Some(FakeReply::Ok(resp)) => Ok(resp),
            Some(FakeReply::Timeout) => Err(Error::Timeout(req.endpoint.path().to_string())),
            Some(FakeReply::Broken(why)) => Err(Error::External(why.to_string())),
            None => Ok(ApiResponse {
                status: 404,
                body: Value::Null,
            }),
        }
    }
}

/// Messenger that records everything and can be told to fail.
#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<i32>,
    sends: Mutex<Vec<(ChatId, String)>>,
    edits: Mutex<Vec<(MessageRef, String)>>,
    keyboards: Mutex<Vec<(ChatId, String, InlineKeyboard)>>,
    fail_edits: AtomicBool,
    fail_sends: AtomicBool,
    fail_keyboards: AtomicBool,
}

impl FakeMessenger {
    pub fn fail_edits(&self, on: bool) {
        self.fail_edits.store(on, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, on: bool) {
        self.fail_sends.store(on, Ordering::SeqCst);
    }

    pub fn fail_keyboards(&self, on: bool) {
        self.fail_keyboards.store(on, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sends.lock().unwrap().clone()
    }

    pub fn edited(&self) -> Vec<(MessageRef, String)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn keyboards(&self) -> Vec<(ChatId, String, InlineKeyboard)> {
        self.keyboards.lock().unwrap().clone()
    }

    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(*guard),
        }
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::External("bot was blocked by the user".to_string()));
        }
        self.sends.lock().unwrap().push((chat_id, html.to_string()));
        Ok(self.alloc(chat_id))
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(Error::External("message to edit not found".to_string()));
        }
        self.edits.lock().unwrap().push((msg, html.to_string()));
        Ok(())
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        if self.fail_keyboards.load(Ordering::SeqCst) {
            return Err(Error::External(
                "Bad Request: BUTTON_DATA_INVALID".to_string(),
            ));
        }
        self.keyboards
            .lock()
            .unwrap()
            .push((chat_id, html.to_string(), keyboard));
        Ok(self.alloc(chat_id))
    }

    async fn answer_callback_query(&self, _callback_id: &str, _text: Option<&str>) -> Result<()> {
        Ok(())
    }
}
