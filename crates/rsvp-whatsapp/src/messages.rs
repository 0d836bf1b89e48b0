//! Chat texts sent by the bot

use rsvp_core::Event;

/// Greetings that identify a sender as a (possibly new) organizer
pub const ORGANIZER_GREETINGS: [&str; 3] = [
    "hola, soy organizador",
    "hola soy organizador",
    "iniciar como organizador",
];

/// Greetings that trigger the organizer welcome
pub const WELCOME_GREETINGS: [&str; 3] = ["hola", "hola, soy organizador", "hola soy organizador"];

pub const WELCOME: &str = "¡Hola! 👋 Soy tu asistente virtual para la gestión de invitaciones.

Puedo ayudarte con:
- Crear eventos para tus celebraciones
- Procesar listas de invitados (envíame un Excel)
- Enviar invitaciones masivas (!enviar)
- Mostrar reportes de estado (!reporte)
- Obtener Excel actualizado (!excel)

¿En qué puedo ayudarte hoy?";

pub const NEW_ORGANIZER_WELCOME: &str = "¡Hola! 👋 Bienvenido(a) al sistema de gestión de eventos.

Como organizador(a), puedes:
1️⃣ Crear eventos con el comando !crear
2️⃣ Importar listas de invitados desde Excel
3️⃣ Enviar invitaciones automáticamente
4️⃣ Recibir respuestas y generar reportes

Para comenzar, usa el comando !crear seguido del nombre de tu evento.
Ejemplo: !crear \"Boda de Juan y María\"

Escribe !ayuda para ver todos los comandos disponibles.";

pub const HELP: &str = "📋 Comandos disponibles:
!crear \"Nombre del evento\" \"Descripción opcional\" - Crea un nuevo evento
!eventos - Muestra tus eventos registrados
!borrar (número) - Borra un evento por su número en la lista
!enviar - Inicia el envío de invitaciones
!reporte - Muestra el estado actual de respuestas
!excel - Recibe el archivo Excel actualizado
!reset - (Solo para pruebas) Borra todos tus datos como organizador
!ayuda - Muestra esta ayuda";

pub const NOT_AUTHORIZED: &str = "❌ No estás autorizado como organizador.
Para registrarte como organizador, debes acceder desde nuestra página web y obtener un código de verificación.
Visita el sitio web y sigue las instrucciones para registrarte.";

pub const NOT_REGISTERED_ORGANIZER: &str =
    "❌ No estás registrado como organizador. Usa !crear para comenzar.";

pub const NO_ACTIVE_EVENT: &str = "❌ No tienes un evento activo.
Usa !crear para crear un nuevo evento o !eventos para ver tus eventos existentes.";

pub const NO_ACTIVE_EVENT_FOR_UPLOAD: &str =
    "❌ No tienes un evento activo. Primero crea un evento usando !crear";

pub const UNKNOWN_COMMAND: &str =
    "❌ Comando no reconocido. Usa !ayuda para ver los comandos disponibles.";

pub const VERIFIED: &str = "✅ ¡Verificación completada con éxito!
Ahora puedes crear y gestionar eventos.
Usa !crear para crear tu primer evento o !ayuda para ver todos los comandos disponibles.";

pub const CODE_MISSING: &str =
    "❌ No se encontró un código de verificación para tu número. Por favor, genera uno desde la página web.";

pub const CODE_EXPIRED: &str =
    "❌ Tu código de verificación ha expirado. Por favor, genera uno nuevo desde la página web.";

pub const CODE_MISMATCH: &str = "❌ Código de verificación incorrecto. Verifica e intenta nuevamente.";

pub const RESET_DONE: &str = "✅ Modo de prueba: Se han borrado todos tus datos como organizador.

Ahora puedes iniciar el flujo nuevamente como un nuevo usuario.
Para registrarte como organizador:

1. Visita el landing page y completa el formulario
2. Recibirás un código de verificación
3. Envía !verificar CODIGO para activar tu cuenta";

pub const CREATE_USAGE: &str = "❌ Formato incorrecto.
Usa: !crear \"Nombre del evento\" \"Descripción opcional\"
Ejemplo: !crear \"Boda de Juan y María\" \"15 de diciembre\"";

pub const DELETE_USAGE: &str = "❌ Formato incorrecto.
Usa: !borrar (número)
Ejemplo: !borrar 1

Para ver la lista de tus eventos, usa !eventos";

pub const NO_EVENTS: &str = "No tienes eventos registrados. Usa !crear para comenzar.";

pub const NO_EVENTS_TO_DELETE: &str = "No tienes eventos registrados para borrar.";

pub const EXCEL_PREPARING: &str = "💾 Preparando el archivo Excel actualizado...";

pub const EXCEL_CAPTION: &str = "📊 Archivo Excel con los datos actualizados de tu evento";

pub const COMPLETE_EXCEL_CAPTION: &str = "📊 Archivo Excel con todas las respuestas";

pub const NOT_A_GUEST: &str = "¡Hola! Parece que no estás registrado como invitado en ningún evento. Si crees que es un error, contacta al organizador.";

pub const REPLY_NOT_UNDERSTOOD: &str = "❌ Lo siento, no pudimos interpretar tu respuesta";

pub const REPLY_NOT_SAVED: &str = "❌ Lo siento, no pudimos procesar tu respuesta";

pub const ASSISTANT_UNAVAILABLE: &str =
    "❌ Lo siento, hubo un problema al procesar tu mensaje. Intenta de nuevo más tarde.";

pub const NOT_A_SPREADSHEET: &str = "❌ Por favor, envía un archivo Excel (.xlsx)";

fn event_lines(events: &[Event]) -> String {
    events
        .iter()
        .enumerate()
        .map(|(i, event)| format!("{}. {} - {}\n", i + 1, event.name, event.date_label()))
        .collect()
}

/// Numbered prompt sent to an organizer with several events
pub fn event_selection_prompt(events: &[Event]) -> String {
    format!(
        "Tienes varios eventos registrados. Por favor, selecciona uno para trabajar:\n\n{}\nResponde con el número del evento que deseas seleccionar.",
        event_lines(events)
    )
}

/// Numbered prompt sent to a guest invited to several events
pub fn guest_event_prompt(events: &[Event]) -> String {
    format!(
        "Estás invitado(a) a varios eventos. ¿A cuál corresponde tu respuesta?\n\n{}\nResponde con el número del evento.",
        event_lines(events)
    )
}

pub fn event_list(events: &[Event]) -> String {
    format!(
        "📅 Tus eventos registrados:\n\n{}\nPara seleccionar un evento, responde con el número correspondiente.",
        event_lines(events)
    )
}

pub fn working_on(event: &Event) -> String {
    format!("Trabajando con tu evento: {}", event.name)
}

pub fn event_selected(event: &Event) -> String {
    format!("✅ Has seleccionado el evento: {}", event.name)
}

pub fn event_created(name: &str) -> String {
    format!(
        "✅ ¡Evento \"{}\" creado con éxito!\n\nAhora puedes:\n1. Subir tu Excel con la lista de invitados\n2. Usar !enviar para mandar invitaciones\n3. Consultar el estado con !reporte\n\n¿En qué te puedo ayudar ahora?",
        name
    )
}

pub fn confirm_deletion(name: &str) -> String {
    format!(
        "⚠️ ¿Estás seguro de borrar el evento \"{}\"?\nEsta acción no se puede deshacer y eliminará todos los invitados asociados.\n\nPara confirmar, responde con: !borrar confirmar\nPara cancelar, responde con cualquier otro comando.",
        name
    )
}

pub fn event_deleted(name: &str) -> String {
    format!("✅ Evento '{}' borrado correctamente.", name)
}

pub fn invalid_event_number(count: usize) -> String {
    format!(
        "❌ Número de evento inválido. Debes especificar un número entre 1 y {}.",
        count
    )
}

pub fn verification_code(code: &str) -> String {
    format!(
        "🔐 Tu código de verificación es: {code}\n\nPara activar tu cuenta de organizador, envía:\n!verificar {code}\n\nEste código expirará en 24 horas."
    )
}

/// Personalized invitation for the bulk send
pub fn invitation(name: &str) -> String {
    format!(
        "¡Hola {}! 🎉\n\nEstás cordialmente invitado a nuestra celebración. \n\nPor favor, confirma tu asistencia respondiendo a este mensaje.\nSi vienes acompañado, indícalo en tu respuesta.\nSi tienes alguna restricción alimenticia, también háznoslo saber.\n\n¡Esperamos tu respuesta! 🙂",
        name
    )
}

pub fn guest_thanks(guest_name: &str, event_name: &str) -> String {
    format!(
        "¡Gracias {}! Tu respuesta ha sido registrada correctamente para el evento \"{}\".",
        guest_name, event_name
    )
}

pub fn all_responded(total: usize, event_name: &str, report: &str) -> String {
    format!(
        "🎉 ¡Excelente noticia! Todos los invitados ({}) han respondido a la invitación para \"{}\".\n\n📊 Resumen:\n{}\n\nTe envío el archivo Excel actualizado con todas las respuestas.",
        total, event_name, report
    )
}

pub fn excel_kept_on_server(path: &str) -> String {
    format!(
        "📊 El archivo Excel ha sido actualizado y guardado como '{}' en el servidor.",
        path
    )
}
