//! HTML bodies and subjects for every transactional email.

use crate::models::{Order, OrderItem, OrderStatus};
use crate::services::mailer::OutgoingEmail;

/// Formats đồng with dot thousands separators, e.g. `1.234.567đ`.
pub fn format_price(amount: i64) -> String {
  let digits = amount.unsigned_abs().to_string();
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 2);
  for (i, ch) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push('.');
    }
    grouped.push(ch);
  }
  if amount < 0 {
    grouped.insert(0, '-');
  }
  grouped.push('đ');
  grouped
}

/// Minimal HTML escaping for user-provided text.
pub fn escape_html(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  for ch in input.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      c => out.push(c),
    }
  }
  out
}

fn layout(title: &str, accent: &str, content: &str) -> String {
  format!(
    r#"<!DOCTYPE html>
<html lang="vi">
<head><meta charset="UTF-8"><title>{title}</title></head>
<body style="margin:0;padding:0;background:#f6f1e7;font-family:Arial,Helvetica,sans-serif;color:#333">
  <div style="max-width:600px;margin:0 auto;background:#ffffff">
    <div style="background:{accent};padding:24px;text-align:center;color:#ffffff">
      <h1 style="margin:0;font-size:22px">{title}</h1>
      <p style="margin:6px 0 0;font-size:13px">Đặc Sản Việt - Hương vị quê hương</p>
    </div>
    <div style="padding:24px;line-height:1.6">{content}</div>
    <div style="padding:16px;text-align:center;font-size:12px;color:#888;border-top:1px solid #eee">
      © Đặc Sản Việt. Email này được gửi tự động, vui lòng không trả lời.
    </div>
  </div>
</body>
</html>"#
  )
}

fn order_summary(order: &Order) -> String {
  let mut rows = format!(
    "<p><strong>Mã đơn hàng:</strong> {}<br><strong>Trạng thái:</strong> {}<br><strong>Thanh toán:</strong> {}</p>",
    escape_html(&order.order_number),
    order.status.display_name(),
    order.payment_method.display_text()
  );
  rows.push_str(&format!(
    "<p><strong>Giao đến:</strong> {} - {}<br>{}</p>",
    escape_html(&order.customer_name),
    escape_html(&order.customer_phone),
    escape_html(&order.shipping_address_text)
  ));
  rows
}

fn items_table(items: &[OrderItem]) -> String {
  let body: String = items
    .iter()
    .map(|item| {
      format!(
        "<tr><td style=\"padding:6px\">{}</td><td style=\"padding:6px;text-align:center\">{}</td><td style=\"padding:6px;text-align:right\">{}</td><td style=\"padding:6px;text-align:right\">{}</td></tr>",
        escape_html(&item.product_name),
        item.quantity,
        format_price(item.unit_price),
        format_price(item.total_price)
      )
    })
    .collect();
  format!(
    "<table style=\"width:100%;border-collapse:collapse\"><thead><tr style=\"background:#f6f1e7\"><th style=\"padding:6px;text-align:left\">Sản phẩm</th><th>SL</th><th style=\"text-align:right\">Đơn giá</th><th style=\"text-align:right\">Thành tiền</th></tr></thead><tbody>{}</tbody></table>",
    body
  )
}

fn totals_block(order: &Order) -> String {
  let mut out = format!("<p>Tạm tính: {}<br>", format_price(order.subtotal));
  if order.discount_amount > 0 {
    out.push_str(&format!("Giảm giá: -{}<br>", format_price(order.discount_amount)));
  }
  out.push_str(&format!(
    "Phí vận chuyển: {}<br><strong>Tổng cộng: {}</strong></p>",
    if order.shipping_fee == 0 {
      "Miễn phí".to_string()
    } else {
      format_price(order.shipping_fee)
    },
    format_price(order.total_amount)
  ));
  out
}

pub struct ConsultationDetails<'a> {
  pub name: &'a str,
  pub phone: &'a str,
  pub email: &'a str,
  pub interest: Option<&'a str>,
  pub message: Option<&'a str>,
}

/// Display name for the consultation interest picked on the form.
pub fn interest_display_name(interest: Option<&str>) -> String {
  match interest.map(str::trim).unwrap_or("") {
    "mien-bac" => "Đặc sản miền Bắc".to_string(),
    "mien-trung" => "Đặc sản miền Trung".to_string(),
    "mien-nam" => "Đặc sản miền Nam".to_string(),
    "tet" => "Sản phẩm Tết".to_string(),
    "qua-tang" => "Quà tặng doanh nghiệp".to_string(),
    "" => "Không chọn".to_string(),
    other => other.to_string(),
  }
}

pub fn consultation(shop_inbox: &str, details: &ConsultationDetails<'_>) -> OutgoingEmail {
  let message = details
    .message
    .filter(|m| !m.trim().is_empty())
    .map(escape_html)
    .unwrap_or_else(|| "(Không có lời nhắn)".to_string());
  let content = format!(
    "<p>Có yêu cầu tư vấn mới từ website:</p><p><strong>Họ tên:</strong> {}<br><strong>Số điện thoại:</strong> {}<br><strong>Email:</strong> {}<br><strong>Quan tâm:</strong> {}</p><p><strong>Lời nhắn:</strong><br>{}</p>",
    escape_html(details.name),
    escape_html(details.phone),
    escape_html(details.email),
    escape_html(&interest_display_name(details.interest)),
    message
  );
  OutgoingEmail::new(
    shop_inbox,
    "Yêu Cầu Tư Vấn Mới - Đặc Sản Việt",
    layout("Yêu Cầu Tư Vấn Mới", "#b5651d", &content),
  )
}

pub fn password_reset_link(to: &str, reset_link: &str) -> OutgoingEmail {
  let content = format!(
    "<p>Chúng tôi nhận được yêu cầu đặt lại mật khẩu cho tài khoản của bạn.</p><p style=\"text-align:center\"><a href=\"{link}\" style=\"background:#b5651d;color:#fff;padding:12px 24px;border-radius:4px;text-decoration:none\">Đặt lại mật khẩu</a></p><p>Liên kết có hiệu lực trong 1 giờ. Nếu bạn không yêu cầu, hãy bỏ qua email này.</p><p style=\"font-size:12px;color:#888\">{link}</p>",
    link = escape_html(reset_link)
  );
  OutgoingEmail::new(
    to,
    "🔐 Đặt Lại Mật Khẩu - Đặc Sản Việt",
    layout("Đặt Lại Mật Khẩu", "#b5651d", &content),
  )
}

pub fn password_reset_confirmation(to: &str) -> OutgoingEmail {
  let content = "<p>Mật khẩu của bạn đã được đặt lại thành công.</p><p>Nếu bạn không thực hiện thay đổi này, vui lòng liên hệ với chúng tôi ngay.</p>";
  OutgoingEmail::new(
    to,
    "✅ Mật Khẩu Đã Được Đặt Lại - Đặc Sản Việt",
    layout("Mật Khẩu Đã Được Đặt Lại", "#2e7d32", content),
  )
}

pub fn new_password(to: &str, display_name: &str, password: &str) -> OutgoingEmail {
  let content = format!(
    "<p>Xin chào {},</p><p>Mật khẩu mới của bạn là: <strong style=\"font-size:18px;letter-spacing:2px\">{}</strong></p><p>Hãy đăng nhập và đổi mật khẩu ngay sau đó.</p>",
    escape_html(display_name),
    escape_html(password)
  );
  OutgoingEmail::new(to, "Mật khẩu mới - Đặc Sản Việt", layout("Mật Khẩu Mới", "#b5651d", &content))
}

pub fn welcome(to: &str, display_name: &str) -> OutgoingEmail {
  let content = format!(
    "<p>Xin chào {},</p><p>Cảm ơn bạn đã đăng ký tài khoản tại Đặc Sản Việt. Hãy khám phá những món quà quê hương từ khắp ba miền!</p>",
    escape_html(display_name)
  );
  OutgoingEmail::new(
    to,
    "Chào mừng bạn đến với Đặc Sản Việt",
    layout("Chào Mừng Bạn", "#b5651d", &content),
  )
}

pub fn order_confirmation(order: &Order, items: &[OrderItem]) -> OutgoingEmail {
  let content = format!(
    "<p>Xin chào {},</p><p>Cảm ơn bạn đã đặt hàng tại Đặc Sản Việt. Đơn hàng của bạn đã được tiếp nhận.</p>{}{}{}",
    escape_html(&order.customer_name),
    order_summary(order),
    items_table(items),
    totals_block(order)
  );
  OutgoingEmail::new(
    &order.customer_email,
    format!("Xác Nhận Đơn Hàng #{} - Đặc Sản Việt", order.order_number),
    layout("Xác Nhận Đơn Hàng", "#b5651d", &content),
  )
}

pub fn shipping_notification(order: &Order) -> OutgoingEmail {
  let carrier = order.shipping_carrier.as_deref().unwrap_or("Đang cập nhật");
  let tracking = order.tracking_number.as_deref().unwrap_or("Đang cập nhật");
  let content = format!(
    "<p>Xin chào {},</p><p>Đơn hàng <strong>{}</strong> đã được giao cho đơn vị vận chuyển.</p><p><strong>Nhà vận chuyển:</strong> {}<br><strong>Mã vận đơn:</strong> {}<br><strong>Thời gian dự kiến:</strong> 2-3 ngày làm việc</p>{}",
    escape_html(&order.customer_name),
    escape_html(&order.order_number),
    escape_html(carrier),
    escape_html(tracking),
    totals_block(order)
  );
  OutgoingEmail::new(
    &order.customer_email,
    format!("🚚 Đơn Hàng Đang Được Giao - {}", order.order_number),
    layout("Đơn Hàng Đang Được Giao", "#1565c0", &content),
  )
}

pub fn order_completion(order: &Order) -> OutgoingEmail {
  let content = format!(
    "<p>Xin chào {},</p><p>Đơn hàng <strong>{}</strong> đã được giao thành công. Cảm ơn bạn đã tin tưởng Đặc Sản Việt!</p><p>Hy vọng bạn hài lòng với sản phẩm. Đừng quên để lại đánh giá nhé.</p>",
    escape_html(&order.customer_name),
    escape_html(&order.order_number)
  );
  OutgoingEmail::new(
    &order.customer_email,
    format!("🎉 Cảm Ơn Bạn - Đơn Hàng Hoàn Tất {}", order.order_number),
    layout("Đơn Hàng Hoàn Tất", "#2e7d32", &content),
  )
}

pub fn payment_failure(order: &Order, retry_link: &str) -> OutgoingEmail {
  let content = format!(
    "<p>Xin chào {},</p><p>Thanh toán cho đơn hàng <strong>{}</strong> ({}) chưa thành công.</p><p style=\"text-align:center\"><a href=\"{}\" style=\"background:#c62828;color:#fff;padding:12px 24px;border-radius:4px;text-decoration:none\">Thanh toán lại</a></p>",
    escape_html(&order.customer_name),
    escape_html(&order.order_number),
    format_price(order.total_amount),
    escape_html(retry_link)
  );
  OutgoingEmail::new(
    &order.customer_email,
    format!("⚠️ Thanh Toán Chưa Thành Công - {}", order.order_number),
    layout("Thanh Toán Chưa Thành Công", "#c62828", &content),
  )
}

pub fn payment_confirmation(order: &Order) -> OutgoingEmail {
  let content = format!(
    "<p>Xin chào {},</p><p>Chúng tôi đã nhận được thanh toán {} cho đơn hàng <strong>{}</strong> qua {}.</p>",
    escape_html(&order.customer_name),
    format_price(order.total_amount),
    escape_html(&order.order_number),
    order.payment_method.display_text()
  );
  OutgoingEmail::new(
    &order.customer_email,
    format!("Xác Nhận Thanh Toán - Đơn Hàng {}", order.order_number),
    layout("Xác Nhận Thanh Toán", "#2e7d32", &content),
  )
}

pub fn status_update(order: &Order, old_status: OrderStatus, new_status: OrderStatus) -> OutgoingEmail {
  let content = format!(
    "<p>Xin chào {},</p><p>Đơn hàng <strong>{}</strong> đã được cập nhật trạng thái:</p><p>{} → <strong>{}</strong></p>",
    escape_html(&order.customer_name),
    escape_html(&order.order_number),
    old_status.display_name(),
    new_status.display_name()
  );
  OutgoingEmail::new(
    &order.customer_email,
    format!("Cập Nhật Đơn Hàng - {}", order.order_number),
    layout("Cập Nhật Đơn Hàng", "#b5651d", &content),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::order::tests::sample_order;

  #[test]
  fn prices_use_dot_grouping() {
    assert_eq!(format_price(0), "0đ");
    assert_eq!(format_price(999), "999đ");
    assert_eq!(format_price(30_000), "30.000đ");
    assert_eq!(format_price(1_234_567), "1.234.567đ");
    assert_eq!(format_price(-45_000), "-45.000đ");
  }

  #[test]
  fn interest_names() {
    assert_eq!(interest_display_name(Some("mien-trung")), "Đặc sản miền Trung");
    assert_eq!(interest_display_name(Some("qua-tang")), "Quà tặng doanh nghiệp");
    assert_eq!(interest_display_name(None), "Không chọn");
  }

  #[test]
  fn order_subjects_carry_order_number() {
    let order = sample_order(OrderStatus::Shipped);
    assert_eq!(
      order_confirmation(&order, &[]).subject,
      "Xác Nhận Đơn Hàng #ORD170000000000042 - Đặc Sản Việt"
    );
    let shipping = shipping_notification(&order);
    assert_eq!(shipping.subject, "🚚 Đơn Hàng Đang Được Giao - ORD170000000000042");
    assert!(shipping.html_body.contains("2-3 ngày làm việc"));
    assert_eq!(shipping.to, "an@example.com");
    let update = status_update(&order, OrderStatus::Pending, OrderStatus::Confirmed);
    assert!(update.html_body.contains("Chờ xác nhận"));
    assert!(update.html_body.contains("Đã xác nhận"));
  }

  #[test]
  fn user_text_is_escaped() {
    let email = consultation(
      "shop@example.com",
      &ConsultationDetails {
        name: "<script>alert(1)</script>",
        phone: "0912345678",
        email: "x@example.com",
        interest: Some("tet"),
        message: None,
      },
    );
    assert!(!email.html_body.contains("<script>"));
    assert!(email.html_body.contains("Sản phẩm Tết"));
    assert_eq!(email.subject, "Yêu Cầu Tư Vấn Mới - Đặc Sản Việt");
  }

  #[test]
  fn totals_show_free_shipping() {
    let mut order = sample_order(OrderStatus::Pending);
    order.shipping_fee = 0;
    order.total_amount = 250_000;
    let email = order_confirmation(&order, &[]);
    assert!(email.html_body.contains("Miễn phí"));
    assert!(email.html_body.contains("250.000đ"));
  }
}
