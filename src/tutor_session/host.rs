//! 宿主回调：提示框与「存入笔记」

/// 由嵌入面板的宿主实现
pub trait TutorHost: Send + Sync {
    /// 弹出提示
    fn alert(&self, message: &str);

    /// 把内容交给宿主保存；宿主没有保存能力时返回 false
    fn save_to_note(&self, content: &str) -> bool;
}

type AlertFn = Box<dyn Fn(&str) + Send + Sync>;
type SaveFn = Box<dyn Fn(&str) + Send + Sync>;

/// 用闭包拼装的宿主
pub struct NoteSink {
    alert: AlertFn,
    save: Option<SaveFn>,
}

impl NoteSink {
    pub fn new(alert: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            alert: Box::new(alert),
            save: None,
        }
    }

    pub fn with_save(mut self, save: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.save = Some(Box::new(save));
        self
    }
}

impl TutorHost for NoteSink {
    fn alert(&self, message: &str) {
        (self.alert)(message);
    }

    fn save_to_note(&self, content: &str) -> bool {
        match &self.save {
            Some(save) => {
                save(content);
                true
            }
            None => false,
        }
    }
}
