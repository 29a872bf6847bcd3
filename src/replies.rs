//! Fixed reply texts.

pub fn greeting() -> &'static str {
    "Привет! Я бот для поиска льгот для инвалидов. Напишите мне, какие льготы вас интересуют, \
     например: 'парковка для инвалидов 2 группы' или 'лекарства для инвалидов'."
}

pub fn welcome() -> &'static str {
    "👋 Добро пожаловать в бот поиска льгот для инвалидов!\n\n\
     Я помогу вам найти информацию о льготах, пособиях и других мерах поддержки.\n\n\
     🎯 Для точного поиска используйте конкретные слова:\n\
     • Сфера: \"парковка\", \"лекарства\", \"проезд\", \"ЖКУ\", \"налоги\"\n\
     • Группа: \"1 группа\", \"2 группа\", \"3 группа\", \"ребенок-инвалид\"\n\
     • Конкретный запрос: \"парковка для инвалидов 2 группы\"\n\n\
     📝 Просто напишите ваш вопрос, и я найду подходящие льготы!"
}

pub fn help() -> &'static str {
    "❓ Как пользоваться ботом:\n\n\
     Для точного поиска используйте конкретные запросы:\n\
     • По сфере: \"парковка\", \"лекарства\", \"проезд\", \"ЖКУ\"\n\
     • По группе: \"льготы для 1 группы\", \"инвалид 2 группы\"\n\
     • Для детей: \"ребенок-инвалид\", \"детский сад\"\n\
     • Комбинированные: \"парковка для инвалидов 2 группы\"\n\n\
     📊 Команды:\n\
     /start - начать работу\n\
     /help - помощь\n\
     /stats - статистика\n\n\
     💡 Совет: чем конкретнее запрос, тем точнее будут результаты!"
}

/// The bot keeps no per-user state, so statistics describe the service itself.
pub fn stats() -> &'static str {
    concat!(
        "📊 Статистика:\n\n",
        "• Версия бота: ",
        env!("CARGO_PKG_VERSION"),
        "\n",
        "• История запросов не сохраняется\n\n",
        "💾 База льгот обновляется регулярно на основе официальных документов."
    )
}

/// Sent when the responder fails. Does not depend on the query.
pub fn fallback() -> &'static str {
    "😔 Извините, сейчас не удалось обработать ваш запрос. \
     Попробуйте переформулировать его или повторите попытку позже. \
     Список команд: /help"
}
